use instance_provisioner::{Config, InstanceProvisionerService, Response};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn function_handler(_event: LambdaEvent<Value>) -> Result<Response, Error> {
    let config = Config::from_env()?;
    let service = InstanceProvisionerService::new(config).await;
    let output = service.run().await?;
    Ok(Response::from(&output))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    run(service_fn(function_handler)).await
}

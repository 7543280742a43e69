use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use service_model_core::response::HttpResponse;
use service_model_core::storage::{JsonDataAdapter, KeyValueStorage, SecretStorage};
use service_model_lambda::adapters::dynamodb::DynamoDbClient;
use service_model_lambda::adapters::secrets_manager::SecretsManagerClient;
use service_model_lambda::auth::{SharedToken, SharedTokenAuthenticator};
use service_model_lambda::config::LambdaSettings;
use service_model_lambda::handlers::proxy::{
    handle_proxy_event, ApiGatewayProxyEvent, ProxyInput,
};
use service_model_lambda::handlers::records::{record_pipeline, RecordLookup};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .json()
        .init();

    let settings = LambdaSettings::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let secrets = SecretStorage::new(
        Arc::new(SecretsManagerClient::from_conf(&aws_config)),
        JsonDataAdapter::<SharedToken>::default(),
    );
    let authenticator = Arc::new(SharedTokenAuthenticator::new(
        secrets,
        settings.auth_secret_id.clone(),
    ));
    let records = KeyValueStorage::new(
        Arc::new(DynamoDbClient::from_conf(&aws_config)),
        settings.records_table.clone(),
    );
    let pipeline = Arc::new(record_pipeline(
        authenticator,
        Arc::new(RecordLookup::new(records)),
        &settings.auth_header,
        settings.auth_realm.clone(),
        settings.response_config(),
    ));

    tracing::info!(
        component = "records_lambda",
        table = %settings.records_table,
        auth_header = %settings.auth_header,
        "runtime ready"
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<ApiGatewayProxyEvent>| {
        let pipeline = Arc::clone(&pipeline);
        async move {
            let input = ProxyInput::new(event.payload, event.context.request_id);
            Ok::<HttpResponse, Error>(handle_proxy_event(&pipeline, input).await)
        }
    }))
    .await
}

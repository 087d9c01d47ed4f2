#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use std::sync::Arc;
#[cfg(feature = "lambda")]
use vedic_proxy::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use vedic_proxy::{handle, AppConfig, HttpEvent, HttpResponse, ProxyService};

#[cfg(feature = "lambda")]
async fn function_handler(
    service: Arc<ProxyService>,
    event: LambdaEvent<HttpEvent>,
) -> Result<HttpResponse, Error> {
    let response = handle(&service, &event.payload).await;
    tracing::info!("📤 {} {}", event.payload.path, response.status_code);
    Ok(response)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    tracing::info!("Starting vedic-proxy Lambda function");

    // 權杖快取跟著服務實例，在同一個執行環境的多次呼叫間共用
    let config = AppConfig::from_env()
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

    // 缺少憑證時仍啟動，由每個請求回傳設定錯誤
    if let Err(e) = config.validate() {
        tracing::warn!("⚠️ Configuration validation failed: {}", e);
    }

    let service = Arc::new(
        ProxyService::from_config(&config)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?,
    );

    run(service_fn(move |event: LambdaEvent<HttpEvent>| {
        let service = Arc::clone(&service);
        async move { function_handler(service, event).await }
    }))
    .await
}

use dymo_label::{
    create_router, Config, DryRunPrinterService, LabelService, Printer, PrinterService,
    TapeGeometry, UsbPrinterService,
};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match dotenv {
        Ok(path) => info!("Loaded .env from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env()?;

    let printers: Arc<dyn PrinterService> = if config.dry_run {
        info!("Dry run mode, virtual printers: {:?}", config.dry_run_serials);
        let geometry = TapeGeometry::label_manager_pnp();
        Arc::new(DryRunPrinterService::new(
            config
                .dry_run_serials
                .iter()
                .map(|serial| Printer::new(serial.as_str(), &geometry))
                .collect(),
        ))
    } else {
        Arc::new(UsbPrinterService::new(config.threshold)?)
    };

    let service = Arc::new(LabelService::new(printers, config.label_options()));
    let app = create_router(service, config.max_upload);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("Label service listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}

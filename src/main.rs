// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, create a transport and hand it to
//   the UI loop.
// - Returns `anyhow::Result` so library errors print with their context.

use filemail_client::{api::HttpTransport, ui::main_menu};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("filemail_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Transport configured by `FILEMAIL_API_URL` / `FILEMAIL_TIMEOUT_SECS`.
    // See `api::HttpTransport::from_env`.
    let transport = HttpTransport::from_env()?;

    // Start the interactive menu. This call blocks until the user exits.
    main_menu(transport)?;
    Ok(())
}

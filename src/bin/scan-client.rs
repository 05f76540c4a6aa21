use std::process::ExitCode;

use scan_client::config::{self, Action, OutputFormat};
use scan_client::logging;
use scan_client::{AnalysisHandle, HttpBackend, JsonRenderer, Renderer, ScanClient, TextRenderer};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (config, action) = match config::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };

    if let Err(err) = logging::init_logging(&config.log) {
        eprintln!("logging disabled: {}", err);
    }

    let backend = HttpBackend::with_timeout(config.server_addr.as_str(), config.request_timeout)?;
    let client = ScanClient::new(backend).with_poll_config(config.poll.clone());

    match config.output {
        OutputFormat::Text => run(&client, action, &TextRenderer),
        OutputFormat::Json => run(&client, action, &JsonRenderer),
    }
}

fn run<R: Renderer>(
    client: &ScanClient<HttpBackend>,
    action: Action,
    renderer: &R,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let state = match action {
        Action::Scan { file, url } => {
            match client.scan_path(file.as_deref(), url, renderer) {
                Ok(Some(state)) => state,
                Ok(None) => return Ok(ExitCode::SUCCESS),
                Err(err) if err.is_validation() => {
                    eprintln!("{}", err);
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Action::Status { analysis_id } => {
            client.check_status(&AnalysisHandle::new(analysis_id), renderer)
        }
    };

    if state.is_error() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

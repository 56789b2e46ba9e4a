use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match skyfell::app::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("skyfell: {err}");
            ExitCode::FAILURE
        }
    }
}

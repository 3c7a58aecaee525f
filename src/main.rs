use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    match followup_reminders::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("followup-reminders: {e}");
            ExitCode::FAILURE
        }
    }
}

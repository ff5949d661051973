fn main() {
    if let Err(err) = charger_usage_validator::app::run_replay() {
        eprintln!("replay failed: {err}");
        std::process::exit(1);
    }
}

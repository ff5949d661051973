fn main() {
    if let Err(err) = charger_usage_validator::app::run() {
        eprintln!("validation run failed: {err}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(e) = careerforge_client::run() {
        eprintln!("careerforge-client: {:#}", e);
        std::process::exit(1);
    }
}

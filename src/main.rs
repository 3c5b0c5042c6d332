#[tokio::main]
async fn main() {
    if let Err(e) = mrsa_lib::run().await {
        eprintln!("mrsa-mdt: {e}");
        std::process::exit(1);
    }
}

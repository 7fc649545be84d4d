use tracing::error;

#[tokio::main]
async fn main() {
    if let Err(error) = chat_paywall::run().await {
        error!("chat-paywall exited with error: {:#}", error);
        std::process::exit(1);
    }
}

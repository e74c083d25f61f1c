use ledger_gateway::{Config, InitData, LedgerClient};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the demo
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // LEDGER_API_URL etc., see Config::from_env
    let client = LedgerClient::new(Config::from_env()?)?;

    let fragment = std::env::args()
        .nth(1)
        .ok_or("usage: gateway '#tgWebAppData=...'")?;
    let tokens = client
        .login(&InitData::from_launch_fragment(&fragment)?)
        .await?;
    println!("access token expires at {:?}", tokens.access_token_expires_at);

    let wallets: serde_json::Value = client.get_json("/api/wallets").await?;
    println!("{wallets:#}");

    for entry in client.debug_log().entries() {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}

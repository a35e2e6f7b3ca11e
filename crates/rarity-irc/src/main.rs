//! Binary entrypoint for the Rarity IRC bridge.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = rarity_irc::run().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}

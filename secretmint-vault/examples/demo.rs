//! SecretMint: mint and unlock against the in-memory engine and chain.
//!
//! Run with: `cargo run -p secretmint-vault --example demo`
//!
//! Set `SECRETMINT_LOG_FORMAT=json` for JSON logs, `RUST_LOG` to filter.

use secretmint_vault::*;
use std::sync::Arc;

fn section(title: &str) {
    println!("\n── {} {}", title, "─".repeat(60usize.saturating_sub(title.len())));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_format = std::env::var("SECRETMINT_LOG_FORMAT").unwrap_or_else(|_| "pretty".into());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "secretmint_vault=info".into());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(true).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let mut config = VaultConfig::from_env();
    if config.contract_address == secretmint_envelope::Address::ZERO {
        config.contract_address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse()?;
    }

    section("1. Engine");
    let runtime: Arc<FheRuntime<InMemoryFhe>> = Arc::new(FheRuntime::new());
    let sealer = Arc::new(KeySealer::new(runtime.clone(), &config));
    println!("  status before init:  {:?}", runtime.status());

    let domain = Eip712Domain::decryption(config.chain_id, config.decryption_contract);
    runtime.initialize(|| async move { Ok(InMemoryFhe::new(domain)) }).await?;
    let fhe = runtime.engine()?;
    println!("  status after init:   {:?}", runtime.status());

    let chain = InMemorySecretMint::new(config.contract_address, fhe);
    let alice = Arc::new(LocalSigner::random());
    let contract: Arc<dyn SecretMintContract> = Arc::new(chain.connect(alice.address()));
    let events = Arc::new(TracingEventSink);
    println!("  contract:            {}", config.contract_address);
    println!("  account:             {}", alice.address());

    section("2. Mint");
    let minter = Minter::new(sealer.clone(), Some(contract.clone()), &config, events.clone());
    for secret in ["", "The treasure is under the old oak.", "Second secret ✓"] {
        let report = minter.mint(secret).await;
        println!("  {:<40} → {}", format!("{:?}", secret), report.status);
        if let (Some(id), Some(address)) = (report.token_id, report.one_time_address) {
            println!("      token #{} sealed under one-time address {}", id, address);
        }
    }

    section("3. Vault");
    let vault = Vault::new(sealer.clone(), Some(Wallet::new(contract, alice.clone())), events.clone());
    let views = vault.refresh().await?;
    for view in &views {
        println!("  token #{:<3} {}", view.token_id, view.preview());
    }

    section("4. Unlock");
    for view in &views {
        let row = vault.decrypt(view.token_id).await;
        println!(
            "  token #{:<3} {:<10} {}",
            view.token_id,
            row.state.to_string(),
            row.secret.or(row.message).unwrap_or_default()
        );
    }

    section("5. Someone else");
    let mallory = Arc::new(LocalSigner::random());
    let theirs: Arc<dyn SecretMintContract> = Arc::new(chain.connect(mallory.address()));
    let vault = Vault::new(sealer, Some(Wallet::new(theirs, mallory)), events);
    if let Some(view) = views.first() {
        let row = vault.decrypt(view.token_id).await;
        println!("  token #{:<3} {:<10} {}", view.token_id, row.state.to_string(), row.message.unwrap_or_default());
    }

    runtime.teardown();
    println!("\n✓ Done.");
    Ok(())
}

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use webpass_core::{AuthRegistry, Backend, CancellationToken, Config, DiskStore, PassStore, User};

/// Everything a subcommand needs
pub struct Context {
    pub config: Config,
    pub registry: AuthRegistry,
    pub user: String,
    pub password: String,
}

impl Context {
    fn disk_store(&self) -> Result<DiskStore> {
        Ok(DiskStore::with_options(self.config.store_options()?))
    }

    fn backend(&self, store: Arc<dyn PassStore>) -> Result<Backend> {
        Ok(self.config.bind(&self.registry, store)?)
    }

    async fn login(&self) -> Result<Arc<dyn User>> {
        let backend = self.backend(Arc::new(self.disk_store()?))?;
        backend
            .auth(&self.user, &self.password)
            .await
            .with_context(|| format!("authentication as {:?} failed", self.user))
    }
}

pub async fn run(ctx: &Context) -> Result<()> {
    let store = ctx.disk_store()?;
    let backend = ctx.backend(Arc::new(store.clone()))?;

    let lifecycle = CancellationToken::new();
    store.init(lifecycle.clone()).await?;
    info!(
        scheme = backend.scheme(),
        root = %store.path().display(),
        interval_secs = store.sync_interval().as_secs(),
        "sync loop started"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;
    info!("received shutdown signal");

    lifecycle.cancel();
    store.stopped().await;
    info!("sync loop stopped");
    Ok(())
}

pub async fn sync(ctx: &Context) -> Result<()> {
    let user = ctx.login().await?;
    user.sync().await?;
    info!(root = %user.path().display(), "store synced");
    Ok(())
}

pub async fn list(ctx: &Context) -> Result<()> {
    let user = ctx.login().await?;
    let mut stdout = tokio::io::stdout();
    for item in user.list().await? {
        stdout.write_all(item.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}

pub async fn show(ctx: &Context, item: &str) -> Result<()> {
    let user = ctx.login().await?;

    let passphrase = BufReader::new(tokio::io::stdin())
        .lines()
        .next_line()
        .await?
        .unwrap_or_default();

    let plaintext = user.decrypt(item, &passphrase).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(plaintext.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

pub async fn insert(ctx: &Context, item: &str) -> Result<()> {
    let user = ctx.login().await?;

    let mut writer = user.create(item).await?;
    let written = tokio::io::copy(&mut tokio::io::stdin(), &mut writer).await?;
    writer.shutdown().await?;
    info!(item, bytes = written, "item written");
    Ok(())
}

pub async fn key(ctx: &Context) -> Result<()> {
    let user = ctx.login().await?;

    let mut reader = user.open_pgp_key().await?;
    let mut stdout = tokio::io::stdout();
    tokio::io::copy(&mut reader, &mut stdout).await?;
    stdout.flush().await?;
    Ok(())
}

pub async fn login(ctx: &Context) -> Result<()> {
    let user = ctx.login().await?;
    println!("{}", user.path().display());
    Ok(())
}

pub fn schemes(registry: &AuthRegistry) -> Result<()> {
    for (name, description) in registry.list() {
        println!("{:<10} {}", name, description);
    }
    Ok(())
}

//! One-shot newsletter command handlers.

use anyhow::{Context, Result};
use bulletin_core::render::render;
use bulletin_core::{NewsletterApi, NewsletterDraft};

use crate::cli::Session;

pub async fn list(session: &Session) -> Result<()> {
    let api = session.api(session.http()?);
    api.authenticate(&session.credentials)
        .await
        .context("log in")?;

    let newsletters = api.list().await?;
    if newsletters.is_empty() {
        println!("No newsletters found.");
    } else {
        for newsletter in &newsletters {
            println!("{}\n", render(newsletter));
        }
    }
    Ok(())
}

pub async fn create(session: &Session, title: &str, content: &str) -> Result<()> {
    let api = session.api(session.http()?);
    api.authenticate(&session.credentials)
        .await
        .context("log in")?;

    let created = api.create(&NewsletterDraft::new(title, content)).await?;
    println!("Created newsletter #{}", created.id);
    println!("{}", render(&created));
    Ok(())
}

pub async fn update(session: &Session, id: i64, title: &str, content: &str) -> Result<()> {
    let api = session.api(session.http()?);
    api.authenticate(&session.credentials)
        .await
        .context("log in")?;

    let updated = api.update(id, &NewsletterDraft::new(title, content)).await?;
    println!("Updated newsletter #{id}");
    if let Some(newsletter) = updated {
        println!("{}", render(&newsletter));
    }
    Ok(())
}

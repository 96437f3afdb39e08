//! Command handlers

use anyhow::{bail, Context, Result};
use bucketfs_cloud::Config;
use bucketfs_core::{BucketFs, Fs, FsOp, Support};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    Config::write_default(path).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn cat(fs: &BucketFs, path: &str) -> Result<()> {
    let body = fs.read(path)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

pub fn put(fs: &BucketFs, path: &str, file: Option<&Path>) -> Result<()> {
    let body = match file {
        Some(file) => fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?,
        None => {
            let mut body = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut body)
                .context("Failed to read stdin")?;
            body
        }
    };

    fs.write(path, &body)?;
    info!("Uploaded {} bytes to {}", body.len(), path);
    Ok(())
}

pub fn stat(fs: &BucketFs, path: &str, json: bool) -> Result<()> {
    let info = fs.stat(path)?;
    let modified = info.modified.map(|m| m.to_rfc3339());

    if json {
        let value = serde_json::json!({
            "name": info.name,
            "size": info.size,
            "modified": modified,
            "is_dir": info.is_dir,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Name:     {}", info.name);
        println!("Size:     {}", info.size);
        println!("Modified: {}", modified.as_deref().unwrap_or("-"));
    }
    Ok(())
}

pub fn mv(fs: &BucketFs, old: &str, new: &str) -> Result<()> {
    fs.rename(old, new)?;
    info!("Renamed {} -> {}", old, new);
    Ok(())
}

pub fn rm(fs: &BucketFs, path: &str) -> Result<()> {
    fs.remove(path)?;
    debug!("Removed {}", path);
    Ok(())
}

pub fn rm_all(fs: &BucketFs, prefix: &str) -> Result<()> {
    fs.remove_all(prefix)?;
    info!("Removed everything under {:?}", prefix);
    Ok(())
}

pub fn ls(fs: &BucketFs, prefix: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for page in fs.pages(prefix) {
        let page = page.map_err(bucketfs_core::Error::from)?;
        for key in page.keys {
            writeln!(stdout, "{}", key)?;
        }
    }
    Ok(())
}

pub fn mkdir(fs: &BucketFs, path: &str) -> Result<()> {
    fs.mkdir_all(path, 0o755)?;
    if fs.support(FsOp::MkdirAll) == Support::Unsupported {
        info!("{} has no directories; {} exists implicitly once a key is written under it", fs.name(), path);
    }
    Ok(())
}

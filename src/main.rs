#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::assigning_clones,
    clippy::bool_to_int_with_if,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::cast_possible_wrap,
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::float_cmp,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unused_self,
    clippy::cast_precision_loss,
    clippy::unnecessary_cast,
    clippy::unnecessary_lazy_evaluations,
    clippy::unnecessary_literal_bound,
    clippy::unnecessary_map_or,
    clippy::unnecessary_wraps,
    dead_code
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use mediabridge::config::{
    build_http_client, ConfigIssueSeverity, ConfigValidator, ReadinessValidator,
};
use mediabridge::media::{create_download_cache, create_media_fetcher, AssetResolver};
use mediabridge::providers::{
    ensure_session, list_providers, ProviderRuntimeOptions,
};
use mediabridge::sessions::create_session_store;
use mediabridge::{
    create_provider, AssetMediaType, AuthorizeResult, CancellationToken, Config, MediaAsset,
    MediaProvider, MediaQuery, MediaSource, SourceKind,
};

fn parse_media_type(s: &str) -> std::result::Result<AssetMediaType, String> {
    s.parse()
}

fn parse_min_duration(s: &str) -> std::result::Result<f64, String> {
    let d: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !d.is_finite() || d < 0.0 {
        return Err("min duration must be a non-negative number of seconds".to_string());
    }
    Ok(d)
}

/// `mediabridge` - one interface over local and social media sources.
#[derive(Parser, Debug)]
#[command(name = "mediabridge")]
#[command(version)]
#[command(about = "List and fetch media from the sandbox, the photo album, Instagram and Facebook.", long_about = None)]
struct Cli {
    /// Directory holding config.toml (default: ~/.mediabridge)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Source name or alias (sandbox, album, instagram, facebook)
    source: String,

    /// Media type to list (video, image, live-photo, unknown)
    #[arg(long = "type", default_value = "video", value_parser = parse_media_type)]
    media_type: AssetMediaType,

    /// Minimum duration in seconds, inclusive. Only the album honours it.
    #[arg(long, default_value = "0", value_parser = parse_min_duration)]
    min_duration: f64,
}

impl QueryArgs {
    fn query(&self) -> MediaQuery {
        MediaQuery::new(self.media_type).with_min_duration(self.min_duration)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List supported media sources
    Providers,

    /// Show config paths and source readiness
    Status,

    /// Authorize against a source and list its media
    #[command(long_about = "\
Authorize against a source and list its media.

Social sources run the OAuth authorization-code flow: the authorize \
address is printed, and you paste back the address the provider \
redirected to.

Examples:
  mediabridge list sandbox
  mediabridge list sandbox --type image
  mediabridge list instagram --json
  mediabridge list album --min-duration 5")]
    List {
        #[command(flatten)]
        query: QueryArgs,

        /// Print assets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve an asset to a playable local file and print its path
    #[command(long_about = "\
Resolve an asset to a playable local file and print its path.

Remote videos are downloaded into the cache directory once and reused \
afterwards. Sandbox videos are returned in place.

Examples:
  mediabridge pull sandbox
  mediabridge pull facebook --index 2")]
    Pull {
        #[command(flatten)]
        query: QueryArgs,

        /// Position of the asset in the listing
        #[arg(long, default_value = "0")]
        index: usize,
    },

    /// Save the thumbnail of a remote asset
    Thumbnail {
        #[command(flatten)]
        query: QueryArgs,

        /// Position of the asset in the listing
        #[arg(long, default_value = "0")]
        index: usize,

        /// File to write the thumbnail bytes to
        #[arg(long)]
        out: PathBuf,
    },
}

struct App {
    config: Config,
    cancel: CancellationToken,
}

impl App {
    fn source(&self, name: &str) -> Result<MediaSource> {
        create_provider(name, &self.config, &ProviderRuntimeOptions::default())
    }

    fn resolver(&self) -> AssetResolver {
        let client = build_http_client(&self.config.http);
        AssetResolver::new(
            create_media_fetcher(client),
            create_download_cache(&self.config.cache_path(), &self.config.http),
        )
        .with_thumbnail_options(self.config.http.fetch_options())
    }

    /// Authorize against the source and list it.
    async fn list(&self, args: &QueryArgs) -> Result<Vec<MediaAsset>> {
        let source = self.source(&args.source)?;
        let store = create_session_store();
        let session = match ensure_session(&source, store.as_ref(), &self.cancel).await {
            AuthorizeResult::Success(session) => session,
            AuthorizeResult::Fail(error) => {
                bail!("Authorization with {} failed: {error}", source.name())
            }
            AuthorizeResult::Cancelled => bail!("Authorization with {} cancelled", source.name()),
        };
        let assets = source
            .fetch_media(&session, &args.query())
            .await
            .with_context(|| format!("Listing {} failed", source.name()))?;
        Ok(assets)
    }

    async fn pick(&self, args: &QueryArgs, index: usize) -> Result<MediaAsset> {
        let mut assets = self.list(args).await?;
        if index >= assets.len() {
            bail!(
                "No asset at index {index}: {} listed {} {} asset(s)",
                args.source,
                assets.len(),
                args.media_type
            );
        }
        Ok(assets.swap_remove(index))
    }
}

fn print_assets(assets: &[MediaAsset]) {
    if assets.is_empty() {
        println!("No media found.");
        return;
    }
    for (index, asset) in assets.iter().enumerate() {
        let location = asset
            .coordinate
            .map(|c| format!("  @{:.4},{:.4}", c.latitude, c.longitude))
            .unwrap_or_default();
        println!(
            "{index:>3}  {:<10} {:>8.1}s  {}{location}",
            asset.media_type.as_str(),
            asset.duration,
            asset.identifier
        );
    }
}

fn print_status(config: &Config) {
    println!("mediabridge {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Config:      {}", config.config_path.display());
    println!("Sandbox:     {}", config.sandbox_path().display());
    println!("Cache:       {}", config.cache_path().display());
    println!();
    println!("Sources:");
    for provider in list_providers() {
        let readiness = match provider.name.parse::<SourceKind>() {
            Ok(SourceKind::Sandbox) => "ready".to_string(),
            Ok(SourceKind::SystemAlbum) => "no host photo library".to_string(),
            Ok(kind) => match config.social(kind) {
                Some(section) => format!("configured (client_id {})", section.client_id),
                None => "not configured".to_string(),
            },
            Err(e) => e,
        };
        println!("  {:<10} {readiness}", provider.name);
    }

    let issues = ReadinessValidator.validate(config);
    if !issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in issues {
            let tag = match issue.severity {
                ConfigIssueSeverity::Error => "error",
                ConfigIssueSeverity::Warning => "warn",
            };
            println!("  [{tag}] {}: {}", issue.field, issue.message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.as_os_str().is_empty() {
            bail!("--config-dir cannot be empty");
        }
    }

    // Initialize logging - respects RUST_LOG env var, defaults to WARN so
    // listings stay readable
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Commands::Providers = cli.command {
        println!("Supported sources:");
        for p in list_providers() {
            let aliases = if p.aliases.is_empty() {
                String::new()
            } else {
                format!("  (aliases: {})", p.aliases.join(", "))
            };
            let kind = if p.networked { "oauth" } else { "local" };
            println!("  {:<10} {:<24} [{kind}]{aliases}", p.name, p.display_name);
        }
        return Ok(());
    }

    let config = Config::load_or_init(cli.config_dir.as_deref()).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }
    let ctx = App { config, cancel };

    match cli.command {
        Commands::Providers => unreachable!(),
        Commands::Status => {
            print_status(&ctx.config);
            Ok(())
        }
        Commands::List { query, json } => {
            let assets = ctx.list(&query).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&assets)?);
            } else {
                print_assets(&assets);
            }
            Ok(())
        }
        Commands::Pull { query, index } => {
            let asset = ctx.pick(&query, index).await?;
            let Some(playable) = ctx.resolver().playable(&asset, &ctx.cancel).await? else {
                bail!("{} is not playable; only videos resolve to a file", asset.identifier);
            };
            tracing::info!(origin = ?playable.origin, "Resolved playable file");
            println!("{}", playable.path.display());
            Ok(())
        }
        Commands::Thumbnail { query, index, out } => {
            let asset = ctx.pick(&query, index).await?;
            let Some(thumbnail) = ctx.resolver().thumbnail(&asset, &ctx.cancel).await? else {
                bail!(
                    "{} assets have no downloadable thumbnail",
                    asset.source.as_str()
                );
            };
            tokio::fs::write(&out, &thumbnail.data)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Wrote {} bytes ({}) to {}",
                thumbnail.data.len(),
                thumbnail.mime_type,
                out.display()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_has_no_flag_conflicts() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_parses_type_and_duration() {
        let cli = Cli::try_parse_from([
            "mediabridge",
            "list",
            "album",
            "--type",
            "video",
            "--min-duration",
            "3.5",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::List { query, json } => {
                assert_eq!(query.source, "album");
                assert_eq!(query.media_type, AssetMediaType::Video);
                assert!((query.min_duration - 3.5).abs() < f64::EPSILON);
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_min_duration_is_rejected() {
        assert!(Cli::try_parse_from(["mediabridge", "list", "album", "--min-duration", "-1"])
            .is_err());
    }

    #[test]
    fn thumbnail_requires_out() {
        assert!(Cli::try_parse_from(["mediabridge", "thumbnail", "instagram"]).is_err());
    }

    #[test]
    fn list_help_shows_min_duration_only_for_album() {
        let mut cmd = Cli::command();
        let list = cmd.find_subcommand_mut("list").unwrap();
        let help = list.render_long_help().to_string();
        assert!(help.contains("mediabridge list album --min-duration 5"));
        for social in ["instagram", "facebook"] {
            assert!(!help.contains(&format!("list {social} --min-duration")));
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli =
            Cli::try_parse_from(["mediabridge", "status", "--config-dir", "/tmp/mb"]).unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/mb")));
    }
}

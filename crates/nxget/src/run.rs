//! Command drivers.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use nxget_cdn::{Cdn, CdnClient, CdnConfig, MetaBlob, PemDocument, assemble};
use nxget_cnmt::{CnmtEntry, ContainerDecoder, VersionCode, resolve};
use nxget_fetch::{Pipeline, ProgressReporter};
use nxget_hac::{HacDecoder, Keyset};

use crate::store::DirStore;
use crate::{Cli, GetLatestArgs};

/// Exit code when the user declines to overwrite the output directory.
const EXIT_DECLINED: i32 = 2;

fn make_client(cli: &Cli) -> Result<CdnClient> {
    let pem = PemDocument::from_file(&cli.connection.cert)
        .with_context(|| format!("loading certificate {}", cli.connection.cert.display()))?;
    let identity = assemble(&pem)?;
    let config = CdnConfig {
        firmware_version: cli.connection.firmware_version.clone(),
        platform: cli.connection.platform.clone(),
        device_id: cli.connection.device_id.clone(),
        env: cli.connection.env.clone(),
        tencent: cli.connection.tencent,
    };
    Ok(CdnClient::new(config, identity)?)
}

pub async fn get_info(cli: &Cli) -> Result<()> {
    let client = make_client(cli)?;
    let index = client.version_index().await?;
    let latest = index.system_update_metas.first().context("version index is empty")?;
    let version = VersionCode::from_u64(latest.title_version);
    println!(
        "Latest version on CDN: {} [{}] buildnum={}",
        version,
        version.value(),
        version.build_number()
    );
    Ok(())
}

pub async fn get_latest(cli: &Cli, args: &GetLatestArgs) -> Result<()> {
    let keyset = Keyset::from_file(&args.keyset)
        .with_context(|| format!("loading keyset {}", args.keyset.display()))?;
    let client = Arc::new(make_client(cli)?);
    let decoder = Arc::new(HacDecoder::new(keyset));

    println!("Getting system-update meta...");
    let index = client.version_index().await?;
    let latest = index.system_update_metas.first().context("version index is empty")?;
    let version = VersionCode::from_u64(latest.title_version);
    let root = client.update_meta(&latest.title_id, &latest.title_version.to_string()).await?;

    let out = args.out.clone().unwrap_or_else(|| default_out_dir(version));
    if !prepare_out_dir(&out, args.ignore_warnings)? {
        eprintln!("Aborting...");
        std::process::exit(EXIT_DECLINED);
    }
    info!(out = %out.display(), "output directory ready");

    let options = LatestOptions {
        jobs: args.jobs,
        titles: args.titles.clone(),
        only_meta: args.only_meta,
        verbose: cli.verbose,
    };
    run_latest(client, decoder, Arc::new(DirStore::new(out)), root, &options).await
}

pub(crate) struct LatestOptions {
    pub jobs: usize,
    pub titles: Vec<String>,
    pub only_meta: bool,
    pub verbose: bool,
}

/// Resolve and download everything reachable from the root meta container.
pub(crate) async fn run_latest<C, D>(
    cdn: Arc<C>,
    decoder: Arc<D>,
    store: Arc<DirStore>,
    root: MetaBlob,
    options: &LatestOptions,
) -> Result<()>
where
    C: Cdn + 'static,
    D: ContainerDecoder + 'static,
{
    // The root is kept on disk as well; the full update includes it.
    store.write_meta_file(&root.content_id, &root.bytes).await?;

    println!("Parsing system-update entries...");
    let mut entries = resolve(decoder.as_ref(), &root.bytes)?;
    filter_titles(&mut entries, &options.titles);
    let (metas, mut contents): (Vec<CnmtEntry>, Vec<CnmtEntry>) =
        entries.into_iter().partition(CnmtEntry::is_meta);

    let pipeline = Pipeline::new(cdn, decoder, options.jobs);

    println!("Downloading {} meta titles...", metas.len());
    let progress =
        Arc::new(ProgressReporter::new(metas.len() as u64, "meta titles", options.verbose));
    let discovered = pipeline.resolve_meta(metas, Arc::clone(&store), Some(Arc::clone(&progress))).await?;
    progress.finish("meta titles done")?;
    contents.extend(discovered);

    if !options.only_meta {
        println!("Downloading {} contents...", contents.len());
        let progress =
            Arc::new(ProgressReporter::new(contents.len() as u64, "contents", options.verbose));
        pipeline.fetch_content(contents, store, Some(Arc::clone(&progress))).await?;
        progress.finish("contents done")?;
    }

    println!("All done!");
    Ok(())
}

fn default_out_dir(version: VersionCode) -> PathBuf {
    PathBuf::from(format!(
        "sysupdate-[{}]-{}-bn_{}",
        version.value(),
        version,
        version.build_number()
    ))
}

/// Keep only the allow-listed meta titles. An empty list keeps everything.
fn filter_titles(entries: &mut Vec<CnmtEntry>, allow: &[String]) {
    if allow.is_empty() {
        return;
    }
    entries.retain(|entry| match entry {
        CnmtEntry::Meta { title_id, .. } => {
            allow.iter().any(|allowed| allowed.eq_ignore_ascii_case(title_id))
        }
        CnmtEntry::Content { .. } => true,
    });
}

/// Make sure the output directory exists and is empty.
///
/// Returns `Ok(false)` when the directory exists and the user declines the
/// overwrite; nothing has been touched in that case.
fn prepare_out_dir(path: &Path, ignore_warnings: bool) -> Result<bool> {
    if path.exists() {
        if !ignore_warnings && !confirm_overwrite(path)? {
            return Ok(false);
        }
        std::fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))?;
    }
    std::fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(true)
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    print!(
        "[WARNING] '{}' already exists.\n\
         Confirm overwrite [type 'y' to accept, anything else to abort]: ",
        path.display()
    );
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use bytes::Bytes;

    use nxget_cdn::{ByteStream, CdnError, ContentBlob, SYSTEM_UPDATE_TITLE, TitleMeta, VersionIndex};
    use nxget_cnmt::{CnmtRecord, ContentDescriptor, DecodeError};

    use super::*;

    struct MockCdn {
        config: CdnConfig,
        meta_blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl Cdn for MockCdn {
        async fn version_index(&self) -> Result<VersionIndex, CdnError> {
            Ok(VersionIndex {
                timestamp: 1,
                system_update_metas: vec![TitleMeta {
                    title_id: SYSTEM_UPDATE_TITLE.into(),
                    title_version: 1,
                }],
            })
        }

        async fn update_meta(&self, title_id: &str, version: &str) -> Result<MetaBlob, CdnError> {
            let url = self.config.update_meta_url(title_id, version);
            Ok(MetaBlob { bytes: b"root".to_vec(), content_id: "00c0".into(), url })
        }

        async fn meta(&self, title_id: &str, version: &str) -> Result<MetaBlob, CdnError> {
            let bytes = self.meta_blobs.lock().unwrap()[title_id].clone();
            let url = self.config.content_meta_url(title_id, title_id);
            let _ = version;
            Ok(MetaBlob { bytes, content_id: format!("cc{title_id}"), url })
        }

        async fn content(&self, content_id: &str) -> Result<ContentBlob, CdnError> {
            let chunks: Vec<Result<Bytes, CdnError>> = vec![Ok(Bytes::from_static(b"payload"))];
            let stream: ByteStream = Box::pin(futures_util::stream::iter(chunks));
            Ok(ContentBlob { stream, url: self.config.content_url(content_id) })
        }
    }

    struct MapDecoder {
        by_blob: HashMap<Vec<u8>, Vec<CnmtRecord>>,
    }

    impl ContainerDecoder for MapDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<Vec<CnmtRecord>, DecodeError> {
            self.by_blob
                .get(bytes)
                .cloned()
                .ok_or_else(|| DecodeError::Corrupt("unknown blob".into()))
        }
    }

    fn options() -> LatestOptions {
        LatestOptions { jobs: 3, titles: Vec::new(), only_meta: false, verbose: true }
    }

    #[tokio::test]
    async fn persists_root_meta_and_all_contents() {
        let first = format!("{}01", "aa".repeat(15));
        let second = format!("{}02", "bb".repeat(15));
        let mut by_blob = HashMap::new();
        by_blob.insert(
            b"root".to_vec(),
            vec![CnmtRecord {
                meta_entries: vec![],
                content_entries: vec![
                    ContentDescriptor { content_id: first.clone() },
                    ContentDescriptor { content_id: second.clone() },
                ],
            }],
        );

        let cdn = Arc::new(MockCdn {
            config: CdnConfig::default(),
            meta_blobs: Mutex::new(HashMap::new()),
        });
        let decoder = Arc::new(MapDecoder { by_blob });
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DirStore::new(dir.path().to_path_buf()));

        let root = cdn.update_meta(SYSTEM_UPDATE_TITLE, "1").await.unwrap();
        run_latest(cdn, decoder, store, root, &options()).await.unwrap();

        assert!(dir.path().join("00c0.cnmt.nca").exists());
        assert_eq!(std::fs::read(dir.path().join(format!("{first}.nca"))).unwrap(), b"payload");
        assert_eq!(std::fs::read(dir.path().join(format!("{second}.nca"))).unwrap(), b"payload");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn only_meta_skips_the_content_pass() {
        let mut by_blob = HashMap::new();
        by_blob.insert(
            b"root".to_vec(),
            vec![CnmtRecord {
                meta_entries: vec![],
                content_entries: vec![ContentDescriptor { content_id: "aa01".into() }],
            }],
        );

        let cdn = Arc::new(MockCdn {
            config: CdnConfig::default(),
            meta_blobs: Mutex::new(HashMap::new()),
        });
        let decoder = Arc::new(MapDecoder { by_blob });
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DirStore::new(dir.path().to_path_buf()));

        let root = cdn.update_meta(SYSTEM_UPDATE_TITLE, "1").await.unwrap();
        let options = LatestOptions { only_meta: true, ..options() };
        run_latest(cdn, decoder, store, root, &options).await.unwrap();

        // Only the root meta container hits the disk.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(dir.path().join("00c0.cnmt.nca").exists());
    }

    #[test]
    fn title_filter_keeps_allow_listed_metas() {
        let mut entries = vec![
            CnmtEntry::Meta { title_id: "0100000000000809".into(), version: "1".into() },
            CnmtEntry::Meta { title_id: "010000000000080B".into(), version: "1".into() },
            CnmtEntry::Content { content_id: "aa01".into() },
        ];
        filter_titles(&mut entries, &["010000000000080b".to_string()]);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            CnmtEntry::Meta { title_id: "010000000000080B".into(), version: "1".into() }
        );
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let mut entries =
            vec![CnmtEntry::Meta { title_id: "0100000000000809".into(), version: "1".into() }];
        filter_titles(&mut entries, &[]);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn default_out_dir_encodes_the_version() {
        let version = VersionCode::from_parts(5, 1, 0, 3);
        let dir = default_out_dir(version);
        let name = dir.to_string_lossy();
        assert!(name.starts_with("sysupdate-["));
        assert!(name.contains("-5.1.0-"));
        assert!(name.ends_with("bn_3"));
    }

    #[test]
    fn overwrites_without_prompting_when_warnings_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("stale.nca"), b"old").unwrap();

        assert!(prepare_out_dir(&target, true).unwrap());
        assert!(target.exists());
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
    }
}

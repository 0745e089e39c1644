//! The import pipeline.
//!
//! Loads the five source files in dependency order: artists and tags
//! first, then the relation files that reference them. Users never
//! arrive in a file of their own; they are synthesized the moment an
//! id first appears as a listener, a tagger, or a friendship
//! participant, always before the row that references them.
//!
//! Rows are staged in memory and flushed in fixed-size batches, one
//! transaction per batch. A failed batch rolls back whole; a
//! re-import resolves key conflicts by the configured policy and never
//! duplicates composite-key rows.

use std::collections::HashSet;
use std::path::Path;

use ostinato_core::model::{Artist, Friendship, ListenEvent, Tag, TaggingEvent, User};
use ostinato_core::schema::Database;

use crate::config::Config;
use crate::error::{ImportError, ImportResult};
use crate::parse;
use crate::report::{ImportReport, StageCounts, StoreTotals};

const ARTISTS_FILE: &str = "artists.dat";
const TAGS_FILE: &str = "tags.dat";
const LISTENS_FILE: &str = "user_artists.dat";
const TAGGINGS_FILE: &str = "user_taggedartists.dat";
const FRIENDS_FILE: &str = "user_friends.dat";

/// Runs the whole-file, idempotent batch import against one store.
#[derive(Debug)]
pub struct Importer<'a> {
    db: &'a Database,
    config: Config,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub const fn new(db: &'a Database, config: Config) -> Self {
        Self { db, config }
    }

    /// Import all five files from a directory and report what landed.
    ///
    /// A missing or unreadable source file aborts only that stage; the
    /// remaining stages still run and the failure is recorded in the
    /// report. A missing data directory is fatal for the whole run.
    pub fn import_all(&self, data_dir: &Path) -> ImportResult<ImportReport> {
        if !data_dir.is_dir() {
            return Err(ImportError::MissingDataDir(data_dir.to_path_buf()));
        }

        let mut report = ImportReport::default();

        self.run_stage("artists", &mut report, |imp, rep| {
            imp.import_artists(&data_dir.join(ARTISTS_FILE), rep)
        });
        self.run_stage("tags", &mut report, |imp, rep| {
            imp.import_tags(&data_dir.join(TAGS_FILE), rep)
        });
        self.run_stage("listens", &mut report, |imp, rep| {
            imp.import_listens(&data_dir.join(LISTENS_FILE), rep)
        });
        self.run_stage("taggings", &mut report, |imp, rep| {
            imp.import_taggings(&data_dir.join(TAGGINGS_FILE), rep)
        });
        self.run_stage("friendships", &mut report, |imp, rep| {
            imp.import_friendships(&data_dir.join(FRIENDS_FILE), rep)
        });

        report.totals = StoreTotals::collect(self.db)?;
        log::info!(
            "import finished: {} rows skipped across all stages",
            report.total_skipped()
        );
        Ok(report)
    }

    fn run_stage(
        &self,
        name: &str,
        report: &mut ImportReport,
        f: impl FnOnce(&Self, &mut ImportReport) -> ImportResult<()>,
    ) {
        log::info!("importing {name}");
        if let Err(e) = f(self, report) {
            log::error!("import stage {name} failed: {e}");
            report.failed_stages.push((name.to_string(), e.to_string()));
        }
    }

    fn import_artists(&self, path: &Path, report: &mut ImportReport) -> ImportResult<()> {
        let lines = parse::read_source(path)?;
        let mut staged: Vec<Artist> = Vec::with_capacity(self.config.batch_size);

        for (line_no, fields) in data_rows(&lines) {
            match parse::parse_artist(&fields, ARTISTS_FILE, line_no) {
                Ok(artist) => staged.push(artist),
                Err(e @ ImportError::MalformedRow { .. }) => {
                    log::warn!("{e}");
                    report.artists.malformed += 1;
                }
                Err(e) => return Err(e),
            }
            if staged.len() >= self.config.batch_size {
                report.artists.merge(self.flush_artists(&staged)?);
                staged.clear();
            }
        }
        if !staged.is_empty() {
            report.artists.merge(self.flush_artists(&staged)?);
        }
        log::info!("artists: {} written", report.artists.written);
        Ok(())
    }

    fn flush_artists(&self, batch: &[Artist]) -> ImportResult<StageCounts> {
        let policy = self.config.on_conflict;
        Ok(self.db.batch(|db| {
            let mut counts = StageCounts::default();
            for artist in batch {
                if db.insert_artist(artist, policy)? {
                    counts.written += 1;
                } else {
                    counts.conflicts += 1;
                }
            }
            Ok(counts)
        })?)
    }

    fn import_tags(&self, path: &Path, report: &mut ImportReport) -> ImportResult<()> {
        let lines = parse::read_source(path)?;
        let mut staged: Vec<Tag> = Vec::with_capacity(self.config.batch_size);

        for (line_no, fields) in data_rows(&lines) {
            match parse::parse_tag(&fields, TAGS_FILE, line_no) {
                Ok(tag) => staged.push(tag),
                Err(e @ ImportError::MalformedRow { .. }) => {
                    log::warn!("{e}");
                    report.tags.malformed += 1;
                }
                Err(e) => return Err(e),
            }
            if staged.len() >= self.config.batch_size {
                report.tags.merge(self.flush_tags(&staged)?);
                staged.clear();
            }
        }
        if !staged.is_empty() {
            report.tags.merge(self.flush_tags(&staged)?);
        }
        log::info!("tags: {} written", report.tags.written);
        Ok(())
    }

    fn flush_tags(&self, batch: &[Tag]) -> ImportResult<StageCounts> {
        Ok(self.db.batch(|db| {
            let mut counts = StageCounts::default();
            for tag in batch {
                // A later duplicate tag value is skipped, never
                // silently overwritten, whatever the policy says.
                if db.insert_tag(tag)? {
                    counts.written += 1;
                } else {
                    counts.conflicts += 1;
                }
            }
            Ok(counts)
        })?)
    }

    fn import_listens(&self, path: &Path, report: &mut ImportReport) -> ImportResult<()> {
        let lines = parse::read_source(path)?;
        let artists = self.db.artist_ids()?;
        let mut seen_users: HashSet<i64> = HashSet::new();
        let mut staged: Vec<ListenEvent> = Vec::with_capacity(self.config.batch_size);

        for (line_no, fields) in data_rows(&lines) {
            let listen = match parse::parse_listen(&fields, LISTENS_FILE, line_no) {
                Ok(listen) => listen,
                Err(e @ ImportError::MalformedRow { .. }) => {
                    log::warn!("{e}");
                    report.listens.malformed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !artists.contains(&listen.artist_id) {
                log::warn!(
                    "{LISTENS_FILE}:{line_no}: unknown artist {}, row dropped",
                    listen.artist_id
                );
                report.listens.referential_violations += 1;
                continue;
            }
            staged.push(listen);
            if staged.len() >= self.config.batch_size {
                self.flush_listens(&staged, &mut seen_users, report)?;
                staged.clear();
            }
        }
        if !staged.is_empty() {
            self.flush_listens(&staged, &mut seen_users, report)?;
        }
        log::info!("listens: {} written", report.listens.written);
        Ok(())
    }

    fn flush_listens(
        &self,
        batch: &[ListenEvent],
        seen_users: &mut HashSet<i64>,
        report: &mut ImportReport,
    ) -> ImportResult<()> {
        let policy = self.config.on_conflict;
        let (counts, users_created) = self.db.batch(|db| {
            let mut counts = StageCounts::default();
            let mut users_created = 0u64;
            for listen in batch {
                // The user row has to exist before the listen row.
                if seen_users.insert(listen.user_id)
                    && db.ensure_user(User::new(listen.user_id))?
                {
                    users_created += 1;
                }
                if db.insert_listen(listen, policy)? {
                    counts.written += 1;
                } else {
                    counts.conflicts += 1;
                }
            }
            Ok((counts, users_created))
        })?;
        report.listens.merge(counts);
        report.users_created += users_created;
        Ok(())
    }

    fn import_taggings(&self, path: &Path, report: &mut ImportReport) -> ImportResult<()> {
        let lines = parse::read_source(path)?;
        let artists = self.db.artist_ids()?;
        let tags = self.db.tag_ids()?;
        let mut seen_users: HashSet<i64> = HashSet::new();
        let mut staged: Vec<TaggingEvent> = Vec::with_capacity(self.config.batch_size);

        for (line_no, fields) in data_rows(&lines) {
            let tagging = match parse::parse_tagging(&fields, TAGGINGS_FILE, line_no) {
                Ok(tagging) => tagging,
                Err(e @ ImportError::MalformedRow { .. }) => {
                    log::warn!("{e}");
                    report.taggings.malformed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !artists.contains(&tagging.artist_id) || !tags.contains(&tagging.tag_id) {
                log::warn!(
                    "{TAGGINGS_FILE}:{line_no}: unknown artist {} or tag {}, row dropped",
                    tagging.artist_id,
                    tagging.tag_id
                );
                report.taggings.referential_violations += 1;
                continue;
            }
            staged.push(tagging);
            if staged.len() >= self.config.batch_size {
                self.flush_taggings(&staged, &mut seen_users, report)?;
                staged.clear();
            }
        }
        if !staged.is_empty() {
            self.flush_taggings(&staged, &mut seen_users, report)?;
        }
        log::info!("taggings: {} written", report.taggings.written);
        Ok(())
    }

    fn flush_taggings(
        &self,
        batch: &[TaggingEvent],
        seen_users: &mut HashSet<i64>,
        report: &mut ImportReport,
    ) -> ImportResult<()> {
        let policy = self.config.on_conflict;
        let (counts, users_created) = self.db.batch(|db| {
            let mut counts = StageCounts::default();
            let mut users_created = 0u64;
            for tagging in batch {
                if seen_users.insert(tagging.user_id)
                    && db.ensure_user(User::new(tagging.user_id))?
                {
                    users_created += 1;
                }
                if db.insert_tagging(tagging, policy)? {
                    counts.written += 1;
                } else {
                    counts.conflicts += 1;
                }
            }
            Ok((counts, users_created))
        })?;
        report.taggings.merge(counts);
        report.users_created += users_created;
        Ok(())
    }

    fn import_friendships(&self, path: &Path, report: &mut ImportReport) -> ImportResult<()> {
        let lines = parse::read_source(path)?;
        let mut seen_users: HashSet<i64> = HashSet::new();
        let mut staged: Vec<Friendship> = Vec::with_capacity(self.config.batch_size);

        for (line_no, fields) in data_rows(&lines) {
            match parse::parse_friendship(&fields, FRIENDS_FILE, line_no) {
                Ok(edge) => staged.push(edge),
                Err(e @ ImportError::MalformedRow { .. }) => {
                    log::warn!("{e}");
                    report.friendships.malformed += 1;
                }
                Err(e) => return Err(e),
            }
            if staged.len() >= self.config.batch_size {
                self.flush_friendships(&staged, &mut seen_users, report)?;
                staged.clear();
            }
        }
        if !staged.is_empty() {
            self.flush_friendships(&staged, &mut seen_users, report)?;
        }
        log::info!("friendships: {} written", report.friendships.written);
        Ok(())
    }

    fn flush_friendships(
        &self,
        batch: &[Friendship],
        seen_users: &mut HashSet<i64>,
        report: &mut ImportReport,
    ) -> ImportResult<()> {
        let (counts, users_created) = self.db.batch(|db| {
            let mut counts = StageCounts::default();
            let mut users_created = 0u64;
            for edge in batch {
                // Both participants are users; either may be unseen.
                for user_id in [edge.user_id, edge.friend_id] {
                    if seen_users.insert(user_id) && db.ensure_user(User::new(user_id))? {
                        users_created += 1;
                    }
                }
                // The directed pair is stored as given; no mirror row
                // is synthesized. Symmetry is resolved at query time.
                if db.insert_friendship(edge)? {
                    counts.written += 1;
                } else {
                    counts.conflicts += 1;
                }
            }
            Ok((counts, users_created))
        })?;
        report.friendships.merge(counts);
        report.users_created += users_created;
        Ok(())
    }
}

/// Iterate the data rows of a source file: header skipped, blank
/// lines dropped, fields split on the sniffed delimiter. Yields
/// 1-based line numbers for error messages.
fn data_rows<'l>(lines: &'l [String]) -> impl Iterator<Item = (usize, Vec<&'l str>)> + 'l {
    let delimiter = lines.first().map_or('\t', |h| parse::sniff_delimiter(h));
    lines
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(move |(idx, line)| (idx + 1, line.split(delimiter).collect()))
}

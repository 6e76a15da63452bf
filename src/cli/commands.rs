use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::actions::CheckMutations;
use crate::app::App;
use crate::bulk::{
    BulkEditDraft, BulkFields, CheckPatch, IntervalUnit, RegionChoice, TimezoneChoice,
};
use crate::config::AppConfig;
use crate::folders::normalize_folder_name;
use crate::model::{CheckId, CheckRecord};
use crate::prefs::{PreferenceStore, SqlitePreferences, TypedPreferences};
use crate::search::{filter_checks, parse_query};
use crate::storage::StorageHandle;
use crate::view::{
    group_checks, sort_checks, sort_checks_raw, ColumnKey, GroupBy, SortKey, ViewPreferences,
    UNSORTED_GROUP_KEY, UNSORTED_GROUP_LABEL,
};

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON file holding an array of checks; `-` or omitted reads stdin
    #[arg()]
    pub file: Option<PathBuf>,
    /// Remove stored checks that are not in the input
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Search query (supports folder:, status:, type:, region:, is:, checked:, created:)
    #[arg()]
    pub query: Vec<String>,
    /// Sort key (custom, name-asc, url-desc, status, ...); defaults to the saved one
    #[arg(long)]
    pub sort: Option<String>,
    /// Grouping (none, folder); defaults to the saved one
    #[arg(long)]
    pub group: Option<GroupBy>,
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
    /// Limit the number of checks printed
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct BulkEditArgs {
    /// Comma separated check ids
    #[arg(long, value_delimiter = ',', required = true)]
    pub ids: Vec<String>,
    /// Check interval, in the unit set by `bulk_edit.interval_unit`
    #[arg(long)]
    pub interval: Option<u32>,
    /// Expected HTTP status codes, e.g. "200,301"
    #[arg(long)]
    pub codes: Option<String>,
    /// Failed attempts before a check is reported down
    #[arg(long, allow_negative_numbers = true)]
    pub attempts: Option<i64>,
    /// Region override, or `auto`
    #[arg(long)]
    pub region: Option<String>,
    /// IANA timezone, or `default`
    #[arg(long)]
    pub timezone: Option<String>,
    /// Print the patch without applying it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FolderArgs {
    /// Check identifier
    pub id: String,
    /// Folder name (trimmed, at most 48 characters)
    pub name: Option<String>,
    /// Remove the check from its folder
    #[arg(long, conflicts_with = "name")]
    pub clear: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IdsArgs {
    /// Check identifiers
    #[arg(required = true)]
    pub ids: Vec<String>,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Check identifier
    pub id: String,
    /// Zero based target position in the custom order
    pub to: usize,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    /// Print every saved preference for the profile
    Show,
    /// Save the sort order
    Sort { key: SortKey },
    /// Save the grouping
    Group { mode: GroupBy },
    /// Show, hide or toggle a column
    Column {
        key: ColumnKey,
        #[arg(long, conflicts_with = "hide")]
        show: bool,
        #[arg(long)]
        hide: bool,
    },
    /// Collapse or expand a folder group
    Collapse { folder: String },
    /// Forget every saved preference for the profile
    Reset,
}

#[derive(Args, Debug, Clone)]
pub struct PrefsArgs {
    #[command(subcommand)]
    pub command: PrefsCommand,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn import_checks(storage: &StorageHandle, args: ImportArgs) -> Result<()> {
    let raw = match args.file.as_ref().filter(|path| path.as_os_str() != "-") {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => match read_stdin()? {
            Some(raw) => raw,
            None => bail!("no input: pass a JSON file or pipe checks on stdin"),
        },
    };
    let records = parse_import(&raw)?;
    let summary = storage
        .import_checks(&records, args.replace)
        .context("importing checks")?;
    println!(
        "Imported {} checks ({} new, {} updated, {} removed)",
        records.len(),
        summary.inserted,
        summary.updated,
        summary.removed
    );
    Ok(())
}

/// Parses an exported array of checks. Records without an id get a fresh one.
fn parse_import(raw: &str) -> Result<Vec<CheckRecord>> {
    let mut records: Vec<CheckRecord> =
        serde_json::from_str(raw).context("parsing checks JSON (expected an array)")?;
    for (index, record) in records.iter_mut().enumerate() {
        if record.url.trim().is_empty() {
            bail!("check #{index} ({}) has no url", record.name);
        }
        if record.id.is_blank() {
            record.id = CheckId::generate();
        }
    }
    Ok(records)
}

pub fn export_checks(storage: &StorageHandle, args: ExportArgs) -> Result<()> {
    let checks = storage.fetch_checks().context("loading checks")?;
    let encoded = serde_json::to_string_pretty(&checks).context("encoding checks")?;
    match args.output {
        Some(path) => {
            fs::write(&path, encoded + "\n")
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported {} checks to {}", checks.len(), path.display());
        }
        None => println!("{encoded}"),
    }
    Ok(())
}

pub fn list_checks(config: Arc<AppConfig>, storage: StorageHandle, args: ListArgs) -> Result<()> {
    let prefs = SqlitePreferences::new(storage.clone(), config.profile.clone());
    let view = prefs.load_view(&config_view(&config));
    let output = run_list(&storage, &view, &args)?;
    print!("{output}");
    Ok(())
}

fn config_view(config: &AppConfig) -> ViewPreferences {
    ViewPreferences {
        sort_by: config.default_sort,
        group_by: config.default_group,
        ..ViewPreferences::default()
    }
}

fn run_list(storage: &StorageHandle, view: &ViewPreferences, args: &ListArgs) -> Result<String> {
    let checks = storage.fetch_checks().context("loading checks")?;
    let query = parse_query(args.query.join(" ").trim());
    let filtered = filter_checks(&checks, &query, None);
    let mut ordered = match args.sort.as_deref() {
        Some(raw) => sort_checks_raw(filtered, raw),
        None => sort_checks(filtered, view.sort_by),
    };
    if let Some(limit) = args.limit {
        ordered.truncate(limit);
    }
    if args.json {
        let mut out = serde_json::to_string_pretty(&ordered).context("encoding checks")?;
        out.push('\n');
        return Ok(out);
    }
    Ok(format_list(&ordered, args.group.unwrap_or(view.group_by)))
}

fn format_list(ordered: &[&CheckRecord], group_by: GroupBy) -> String {
    if ordered.is_empty() {
        return "No checks found.\n".to_string();
    }
    let mut out = String::new();
    match group_by {
        GroupBy::None => {
            for record in ordered {
                write_check_line(&mut out, record, "", true);
            }
        }
        GroupBy::Folder => {
            for group in group_checks(ordered) {
                let _ = writeln!(&mut out, "{} ({})", group.label, group.members.len());
                for record in &group.members {
                    write_check_line(&mut out, record, "  ", false);
                }
            }
        }
    }
    out
}

fn write_check_line(out: &mut String, record: &CheckRecord, indent: &str, show_folder: bool) {
    let status = if record.disabled {
        "paused"
    } else {
        record.status.as_str()
    };
    let _ = write!(
        out,
        "{indent}{:<10} {:<8} {}  {}",
        record.id.as_str(),
        status,
        record.name,
        record.url
    );
    if show_folder {
        if let Some(folder) = record.folder_label() {
            let _ = write!(out, "  [{folder}]");
        }
    }
    out.push('\n');
}

pub fn bulk_edit(config: Arc<AppConfig>, storage: &StorageHandle, args: BulkEditArgs) -> Result<()> {
    let ids = parse_ids(&args.ids)?;
    let patch = build_bulk_patch(config.bulk_edit.interval_unit, &args)?;
    if args.dry_run {
        println!(
            "{}",
            serde_json::to_string_pretty(&patch).context("encoding patch")?
        );
        return Ok(());
    }
    storage
        .bulk_update_settings(&ids, &patch)
        .context("applying bulk edit")?;
    println!("Updated {} checks", ids.len());
    Ok(())
}

/// Turns the provided flags into a patch. Only flags that were passed end up in it.
fn build_bulk_patch(unit: IntervalUnit, args: &BulkEditArgs) -> Result<CheckPatch> {
    let mut draft = BulkEditDraft::new(unit);
    if let Some(interval) = args.interval {
        draft.set_interval(interval)?;
        draft.set_enabled(BulkFields::CHECK_FREQUENCY, true);
    }
    if let Some(codes) = &args.codes {
        draft.set_status_codes(codes.as_str());
        draft.set_enabled(BulkFields::EXPECTED_STATUS_CODES, true);
    }
    if let Some(attempts) = args.attempts {
        draft.set_attempts(attempts)?;
        draft.set_enabled(BulkFields::DOWN_CONFIRMATION_ATTEMPTS, true);
    }
    if let Some(region) = &args.region {
        draft.set_region(RegionChoice::parse(region)?);
        draft.set_enabled(BulkFields::CHECK_REGION, true);
    }
    if let Some(timezone) = &args.timezone {
        draft.set_timezone(TimezoneChoice::parse(timezone)?);
        draft.set_enabled(BulkFields::TIMEZONE, true);
    }
    let patch = draft.build_diff();
    if patch.is_empty() {
        bail!("nothing to change: pass --interval, --codes, --attempts, --region or --timezone");
    }
    Ok(patch)
}

pub fn set_folder(storage: &StorageHandle, args: FolderArgs) -> Result<()> {
    let id = CheckId::new(args.id.trim());
    let folder = if args.clear {
        None
    } else {
        let Some(raw) = args.name.as_deref() else {
            bail!("pass a folder name or --clear");
        };
        match normalize_folder_name(raw) {
            Some(name) => Some(name),
            None => bail!("folder name cannot be empty"),
        }
    };
    storage
        .set_folder(&id, folder.as_deref())
        .with_context(|| format!("moving check {id}"))?;
    match folder {
        Some(name) => println!("Moved {id} to '{name}'"),
        None => println!("Removed {id} from its folder"),
    }
    Ok(())
}

pub fn set_paused(storage: &StorageHandle, args: IdsArgs, disabled: bool) -> Result<()> {
    let ids = parse_ids(&args.ids)?;
    match ids.as_slice() {
        [single] => storage.toggle_status(single, disabled)?,
        many => storage.bulk_toggle_status(many, disabled)?,
    }
    let verb = if disabled { "Paused" } else { "Resumed" };
    println!("{verb} {} checks", ids.len());
    Ok(())
}

pub fn delete_checks(storage: &StorageHandle, args: IdsArgs) -> Result<()> {
    let ids = parse_ids(&args.ids)?;
    if !args.yes {
        let answer = prompt(&format!("Delete {} checks? [y/N]", ids.len()))?;
        if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
            println!("Aborted");
            return Ok(());
        }
    }
    match ids.as_slice() {
        [single] => storage.delete(single)?,
        many => storage.bulk_delete(many)?,
    }
    println!("Deleted {} checks", ids.len());
    Ok(())
}

pub fn check_now(storage: &StorageHandle, args: IdsArgs) -> Result<()> {
    for id in parse_ids(&args.ids)? {
        storage
            .check_now(&id)
            .with_context(|| format!("scheduling check {id}"))?;
        println!("Scheduled {id}");
    }
    Ok(())
}

pub fn move_check(storage: &StorageHandle, args: MoveArgs) -> Result<()> {
    let checks = storage.fetch_checks().context("loading checks")?;
    let ordered = sort_checks(&checks, SortKey::Custom);
    let Some(from) = ordered
        .iter()
        .position(|record| record.id.as_str() == args.id.trim())
    else {
        bail!("check {} not found", args.id);
    };
    storage.reorder(from, args.to)?;
    println!("Moved {} from position {from} to {}", args.id, args.to);
    Ok(())
}

pub fn handle_prefs_command(
    config: Arc<AppConfig>,
    storage: StorageHandle,
    args: PrefsArgs,
) -> Result<()> {
    let prefs = SqlitePreferences::new(storage, config.profile.clone());
    let output = run_prefs(&prefs, &config_view(&config), args.command)?;
    print!("{output}");
    Ok(())
}

fn run_prefs<S>(prefs: &S, defaults: &ViewPreferences, command: PrefsCommand) -> Result<String>
where
    S: PreferenceStore + ?Sized,
{
    match command {
        PrefsCommand::Show => {}
        PrefsCommand::Sort { key } => prefs.set_sort_by(key)?,
        PrefsCommand::Group { mode } => prefs.set_group_by(mode)?,
        PrefsCommand::Column { key, show, hide } => {
            let mut view = prefs.load_view(defaults);
            if show || hide {
                view.columns.set(key, show);
            } else {
                view.columns.toggle(key);
            }
            prefs.set_columns(&view.columns)?;
        }
        PrefsCommand::Collapse { folder } => {
            let key = if folder.trim().eq_ignore_ascii_case(UNSORTED_GROUP_LABEL) {
                UNSORTED_GROUP_KEY.to_string()
            } else {
                folder.trim().to_string()
            };
            let mut view = prefs.load_view(defaults);
            view.collapsed.toggle(&key);
            prefs.set_collapsed(&view.collapsed)?;
        }
        PrefsCommand::Reset => {
            prefs.reset()?;
            return Ok("Preferences reset\n".to_string());
        }
    }
    Ok(format_prefs(&prefs.load_view(defaults)))
}

fn format_prefs(view: &ViewPreferences) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "sort      {}", view.sort_by);
    let _ = writeln!(&mut out, "group     {}", view.group_by);
    let hidden: Vec<&str> = view
        .columns
        .iter()
        .filter(|(_, visible)| !visible)
        .map(|(key, _)| key.title())
        .collect();
    let hidden = if hidden.is_empty() {
        "(none)".to_string()
    } else {
        hidden.join(", ")
    };
    let _ = writeln!(&mut out, "hidden    {hidden}");
    let collapsed: Vec<&str> = view
        .collapsed
        .iter()
        .map(|key| {
            if key == UNSORTED_GROUP_KEY {
                UNSORTED_GROUP_LABEL
            } else {
                key.as_str()
            }
        })
        .collect();
    let collapsed = if collapsed.is_empty() {
        "(none)".to_string()
    } else {
        collapsed.join(", ")
    };
    let _ = writeln!(&mut out, "collapsed {collapsed}");
    out
}

fn parse_ids(raw: &[String]) -> Result<Vec<CheckId>> {
    let ids: Vec<CheckId> = raw
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(CheckId::from)
        .collect();
    if ids.is_empty() {
        bail!("no check ids given");
    }
    Ok(ids)
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::InputRejected;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::model::{CheckStatus, CheckType};
    use crate::prefs::MemoryPreferences;
    use crate::storage;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn setup_storage() -> TestResult<(TempDir, StorageHandle)> {
        let temp_dir = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp_dir.path());
        paths.ensure_directories()?;
        let storage = storage::init(&paths, &StorageOptions::default())?;
        Ok((temp_dir, storage))
    }

    fn seed(storage: &StorageHandle) -> TestResult {
        let mut alpha = CheckRecord::new("a", "Alpha", "https://alpha.test");
        alpha.status = CheckStatus::Online;
        alpha.folder = Some("Ops".into());
        let mut bravo = CheckRecord::new("b", "bravo", "https://bravo.test");
        bravo.status = CheckStatus::Offline;
        let mut charlie = CheckRecord::new("c", "Charlie", "https://charlie.test");
        charlie.disabled = true;
        charlie.folder = Some("Ops".into());
        storage.import_checks(&[charlie, alpha, bravo], false)?;
        Ok(())
    }

    fn list_args(query: &[&str]) -> ListArgs {
        ListArgs {
            query: query.iter().map(|q| q.to_string()).collect(),
            sort: None,
            group: None,
            json: false,
            limit: None,
        }
    }

    fn bulk_args() -> BulkEditArgs {
        BulkEditArgs {
            ids: vec!["a".into()],
            interval: None,
            codes: None,
            attempts: None,
            region: None,
            timezone: None,
            dry_run: true,
        }
    }

    #[test]
    fn import_assigns_missing_ids_and_requires_urls() -> TestResult {
        let records = parse_import(
            r#"[{"name":"Site","url":"https://site.test"},{"id":"x","name":"X","url":"https://x.test","status":"UP"}]"#,
        )?;
        assert_eq!(records.len(), 2);
        assert!(!records[0].id.is_blank());
        assert_eq!(records[1].id.as_str(), "x");
        assert_eq!(records[1].status, CheckStatus::Online);

        assert!(parse_import(r#"[{"name":"Broken","url":"  "}]"#).is_err());
        assert!(parse_import(r#"{"name":"not an array"}"#).is_err());
        Ok(())
    }

    #[test]
    fn import_accepts_exported_nulls() -> TestResult {
        let records = parse_import(
            r#"[{"id":null,"name":"Site","url":"https://site.test","status":null,"type":null,"folder":null}]"#,
        )?;
        assert_eq!(records.len(), 1);
        assert!(!records[0].id.is_blank());
        assert_eq!(records[0].status, CheckStatus::Unknown);
        assert_eq!(records[0].check_type, CheckType::Website);
        Ok(())
    }

    #[test]
    fn list_groups_by_folder_with_unsorted_first() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        seed(&storage)?;
        let mut args = list_args(&[]);
        args.sort = Some("name-asc".into());
        args.group = Some(GroupBy::Folder);
        let output = run_list(&storage, &ViewPreferences::default(), &args)?;
        insta::assert_snapshot!(output, @r###"
        Unsorted (1)
          b          offline  bravo  https://bravo.test
        Ops (2)
          a          online   Alpha  https://alpha.test
          c          paused   Charlie  https://charlie.test
        "###);
        Ok(())
    }

    #[test]
    fn list_applies_query_and_unknown_sort_keeps_order() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        seed(&storage)?;

        let output = run_list(&storage, &ViewPreferences::default(), &list_args(&["folder:ops"]))?;
        assert!(output.contains("Alpha"));
        assert!(output.contains("Charlie"));
        assert!(!output.contains("bravo"));
        assert!(output.contains("[Ops]"));

        let mut args = list_args(&[]);
        args.sort = Some("sideways".into());
        let output = run_list(&storage, &ViewPreferences::default(), &args)?;
        let ids: Vec<&str> = output
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);

        let output = run_list(&storage, &ViewPreferences::default(), &list_args(&["nothing-here"]))?;
        assert_eq!(output, "No checks found.\n");
        Ok(())
    }

    #[test]
    fn list_json_is_an_array_of_records() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        seed(&storage)?;
        let mut args = list_args(&["is:paused"]);
        args.json = true;
        let output = run_list(&storage, &ViewPreferences::default(), &args)?;
        let parsed: Vec<CheckRecord> = serde_json::from_str(&output)?;
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id.as_str(), "c");
        Ok(())
    }

    #[test]
    fn bulk_patch_only_carries_passed_flags() -> TestResult {
        let mut args = bulk_args();
        args.interval = Some(10);
        args.region = Some("auto".into());
        let patch = build_bulk_patch(IntervalUnit::Minutes, &args)?;
        assert_eq!(patch.check_frequency, Some(600));
        assert_eq!(patch.check_region, Some(None));
        assert_eq!(patch.expected_status_codes, None);
        assert_eq!(patch.timezone, None);
        Ok(())
    }

    #[test]
    fn bulk_patch_rejects_bad_input() {
        let mut args = bulk_args();
        args.attempts = Some(0);
        let err = build_bulk_patch(IntervalUnit::Seconds, &args).unwrap_err();
        assert_matches!(
            err.downcast_ref::<InputRejected>(),
            Some(InputRejected::AttemptsOutOfRange { value: 0, .. })
        );

        let mut args = bulk_args();
        args.interval = Some(0);
        assert!(build_bulk_patch(IntervalUnit::Seconds, &args).is_err());

        // codes that are all out of range leave nothing to send
        let mut args = bulk_args();
        args.codes = Some("99, 600".into());
        assert!(build_bulk_patch(IntervalUnit::Seconds, &args).is_err());
    }

    #[test]
    fn folder_names_are_normalized_before_saving() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        seed(&storage)?;
        set_folder(
            &storage,
            FolderArgs {
                id: "b".into(),
                name: Some("  Edge  ".into()),
                clear: false,
            },
        )?;
        let bravo = storage.fetch_check(&CheckId::from("b"))?.expect("bravo");
        assert_eq!(bravo.folder.as_deref(), Some("Edge"));

        let blank = FolderArgs {
            id: "b".into(),
            name: Some("   ".into()),
            clear: false,
        };
        assert!(set_folder(&storage, blank).is_err());

        set_folder(
            &storage,
            FolderArgs {
                id: "b".into(),
                name: None,
                clear: true,
            },
        )?;
        let bravo = storage.fetch_check(&CheckId::from("b"))?.expect("bravo");
        assert_eq!(bravo.folder, None);
        Ok(())
    }

    #[test]
    fn prefs_commands_update_one_key_at_a_time() -> TestResult {
        let store = MemoryPreferences::new();
        let defaults = ViewPreferences::default();

        let output = run_prefs(&store, &defaults, PrefsCommand::Sort { key: SortKey::Status })?;
        assert!(output.contains("sort      status"));
        assert_eq!(store.len(), 1);

        let output = run_prefs(
            &store,
            &defaults,
            PrefsCommand::Column {
                key: ColumnKey::Ssl,
                show: false,
                hide: true,
            },
        )?;
        assert!(output.contains("hidden    SSL"));

        let output = run_prefs(
            &store,
            &defaults,
            PrefsCommand::Collapse {
                folder: "unsorted".into(),
            },
        )?;
        assert!(output.contains("collapsed Unsorted"));
        assert_eq!(store.len(), 3);

        run_prefs(&store, &defaults, PrefsCommand::Reset)?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn move_reorders_by_id() -> TestResult {
        let (_temp_dir, storage) = setup_storage()?;
        seed(&storage)?;
        move_check(
            &storage,
            MoveArgs {
                id: "b".into(),
                to: 0,
            },
        )?;
        let order: Vec<String> = sort_checks(&storage.fetch_checks()?, SortKey::Custom)
            .into_iter()
            .map(|record| record.id.to_string())
            .collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert!(move_check(
            &storage,
            MoveArgs {
                id: "zzz".into(),
                to: 0
            }
        )
        .is_err());
        Ok(())
    }
}

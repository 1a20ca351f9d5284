use crate::{
    backup, codes,
    config::Config,
    confirm::Confirmer,
    form::{Draft, FormState, FIELDS},
    projector,
    sync::{RemoveOutcome, SubmitOutcome, SyncCoordinator},
    transcript::Transcript,
    user::User,
    Args,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::path::PathBuf;

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub session_id: String,
    pub transcript: RefCell<Transcript>,
    pub sync: RefCell<SyncCoordinator>,
    pub form: RefCell<FormState>,
    pub confirmer: Confirmer,
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

/// Initial load; failures are logged and leave the list empty
pub fn load_users(ctx: &Context) {
    let result = ctx.sync.borrow_mut().load_all();
    match result {
        Ok(report) => {
            verbose(ctx, &format!("Loaded {} users", report.loaded));
            for id in &report.duplicates {
                eprintln!("Warning: store returned user {} more than once", id);
            }
            let _ = ctx
                .transcript
                .borrow_mut()
                .load_ok(report.loaded, &report.duplicates);
        }
        Err(e) => {
            eprintln!("Failed to load users: {}", e);
            let _ = ctx.transcript.borrow_mut().load_err(&e.to_string());
        }
    }
}

pub fn run_once(ctx: &Context, commands: &[String]) -> Result<()> {
    for command in commands {
        if handle_command(ctx, command.trim()) {
            break;
        }
    }
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let counts = projector::counts(ctx.sync.borrow().users());
    println!(
        "staffdesk - {} users ({} active, {} support). Type /help for commands, /exit to quit",
        counts.total, counts.active, counts.support
    );

    loop {
        let prompt = match ctx.form.borrow().mode() {
            Some(mode) => format!("staffdesk[{}]> ", mode.as_str()),
            None => "staffdesk> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_command(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Run one console command. Returns true when the session should end.
pub fn handle_command(ctx: &Context, cmd: &str) -> bool {
    let parts = match shell_words::split(cmd) {
        Ok(parts) if !parts.is_empty() => parts,
        Ok(_) => return false,
        Err(e) => {
            println!("Invalid command line: {}", e);
            return false;
        }
    };
    let args: Vec<&str> = parts[1..].iter().map(String::as_str).collect();

    match parts[0].as_str() {
        "/exit" | "/quit" => return true,
        "/help" => print_help(),
        "/list" => handle_list(ctx, &args.join(" ")),
        "/stats" => {
            let counts = projector::counts(ctx.sync.borrow().users());
            println!("Users:   {}", counts.total);
            println!("Active:  {}", counts.active);
            println!("Support: {}", counts.support);
        }
        "/show" => match args.first() {
            Some(id) => match ctx.sync.borrow().find(id) {
                Some(user) => print_user(user, Utc::now()),
                None => println!("No user with id {}", id),
            },
            None => println!("Usage: /show <id>"),
        },
        "/new" => {
            let mut form = ctx.form.borrow_mut();
            if form.is_open() {
                println!("Discarding the previous draft");
            }
            let draft = form.open_for_create(&ctx.config.defaults, Utc::now());
            println!("New user {} - set fields with /set, then /save", draft.id);
        }
        "/edit" => match args.first() {
            Some(id) => {
                let sync = ctx.sync.borrow();
                match sync.find(id) {
                    Some(user) => {
                        ctx.form.borrow_mut().open_for_edit(user);
                        println!(
                            "Editing {} (@{}) - /set fields, then /save",
                            user.id, user.username
                        );
                    }
                    None => println!("No user with id {}", id),
                }
            }
            None => println!("Usage: /edit <id>"),
        },
        "/set" => {
            if args.len() < 2 {
                println!("Usage: /set <field> <value>");
                println!("Fields: {}", FIELDS.join(", "));
            } else {
                let value = args[1..].join(" ");
                match ctx.form.borrow_mut().update_field(args[0], &value) {
                    Ok(()) => {
                        verbose(ctx, &format!("{} = {:?}", args[0], value));
                        if let Some(note) = codes::hint(args[0], &value.to_uppercase()) {
                            println!("{}", note);
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
        }
        "/draft" => {
            let form = ctx.form.borrow();
            match (form.draft(), form.mode()) {
                (Some(draft), Some(mode)) => {
                    println!("Draft ({})", mode.as_str());
                    print_draft(draft);
                }
                _ => println!("No open form. Use /new or /edit <id>"),
            }
        }
        "/save" => handle_save(ctx),
        "/cancel" => match ctx.form.borrow_mut().discard() {
            Some(draft) => println!("Discarded draft {}", draft.id),
            None => println!("No open form"),
        },
        "/delete" => match args.first() {
            Some(id) => handle_delete(ctx, id),
            None => println!("Usage: /delete <id>"),
        },
        "/backup" => handle_backup(ctx, args.first().map(PathBuf::from)),
        "/codes" => {
            println!("Currencies: {}", codes::CURRENCIES.join(" "));
            println!("Countries:  {}", codes::COUNTRIES.join(" "));
        }
        "/session" => {
            println!("Session: {}", ctx.session_id);
            println!("Transcript: {:?}", ctx.transcript.borrow().path);
        }
        other => println!("Unknown command: {}", other),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                - quit");
    println!("  /help                - show commands");
    println!("  /list [term]         - list users, filtered by name, email or nif");
    println!("  /stats               - show user counts");
    println!("  /show <id>           - show one user");
    println!("  /session             - show session info");
    println!("Form:");
    println!("  /new                 - start a new user");
    println!("  /edit <id>           - edit an existing user");
    println!("  /set <field> <value> - change a draft field (quote values with spaces)");
    println!("  /draft               - show the open draft");
    println!("  /save                - send the draft to the store");
    println!("  /cancel              - discard the draft");
    println!("Other:");
    println!("  /delete <id>         - delete a user (asks for confirmation)");
    println!("  /backup [path]       - export users and time records as JSON");
    println!("  /codes               - list supported currencies and countries");
}

fn format_days(days: Option<i64>) -> String {
    match days {
        None => "-".to_string(),
        Some(d) if d < 0 => format!("expired {}d ago", -d),
        Some(d) => format!("{}d", d),
    }
}

fn format_row(user: &User, now: DateTime<Utc>) -> String {
    format!(
        "  {:<20} {:<24} @{:<16} {:<8} {:>8.2} {:<3}  {}",
        user.id,
        user.name,
        user.username,
        if user.is_active { "active" } else { "inactive" },
        user.hourly_rate,
        user.currency,
        format_days(projector::subscription_days_remaining(user, now))
    )
}

fn handle_list(ctx: &Context, term: &str) {
    let sync = ctx.sync.borrow();
    let visible = projector::visible_users(sync.users(), term);
    if visible.is_empty() {
        if term.is_empty() {
            println!("No users.");
        } else {
            println!("No users match '{}'.", term);
        }
        return;
    }

    let now = Utc::now();
    let (employees, support) = projector::partition_by_role(&visible);
    for (title, group) in [("Employees", employees), ("Support", support)] {
        if group.is_empty() {
            continue;
        }
        println!("{} ({}):", title, group.len());
        for user in group {
            println!("{}", format_row(user, now));
        }
    }
}

fn print_user(user: &User, now: DateTime<Utc>) {
    println!("Id:        {}", user.id);
    println!("Name:      {}", user.name);
    println!("Username:  @{}", user.username);
    println!("Email:     {}", user.email);
    println!("Phone:     {}", user.phone);
    println!("NIF:       {}", user.nif.as_deref().unwrap_or("-"));
    println!("Role:      {}", user.role);
    println!("Rate:      {:.2} {}", user.hourly_rate, user.currency);
    println!("Country:   {}", user.country);
    println!("Active:    {}", if user.is_active { "yes" } else { "no" });
    if user.is_provisional_password {
        println!("Password:  provisional");
    }
    match user.first_access_date {
        Some(first) => println!(
            "Access:    first {} ({} left)",
            first.format("%Y-%m-%d"),
            format_days(projector::subscription_days_remaining(user, now))
        ),
        None => println!("Access:    never logged in"),
    }
}

fn print_draft(draft: &Draft) {
    println!("  id: {}", draft.id);
    println!("  name: {}", draft.name);
    println!("  username: {}", draft.username);
    println!("  email: {}", draft.email);
    println!("  phone: {}", draft.phone);
    println!("  nif: {}", draft.nif);
    println!("  password: {}", if draft.password.is_empty() { "" } else { "********" });
    println!("  role: {}", draft.role);
    println!("  hourlyRate: {}", draft.hourly_rate);
    println!("  currency: {}", draft.currency);
    println!("  country: {}", draft.country);
    println!("  isActive: {}", draft.is_active);
    println!("  isProvisionalPassword: {}", draft.is_provisional_password);
}

fn handle_save(ctx: &Context) {
    let (id, mode) = {
        let form = ctx.form.borrow();
        match (form.draft(), form.mode()) {
            (Some(draft), Some(mode)) => (draft.id.clone(), mode),
            _ => {
                println!("No open form. Use /new or /edit <id>");
                return;
            }
        }
    };

    let outcome = {
        let mut form = ctx.form.borrow_mut();
        ctx.sync.borrow_mut().submit(&mut form)
    };

    match outcome {
        Ok(SubmitOutcome::Created(user)) | Ok(SubmitOutcome::Updated(user)) => {
            println!("Saved {} (@{})", user.id, user.username);
            let _ = ctx
                .transcript
                .borrow_mut()
                .user_saved(mode.as_str(), &user.id, &user.username);
        }
        Ok(SubmitOutcome::Invalid(errors)) => {
            println!("Cannot save:");
            for error in errors {
                println!("  - {}", error);
            }
        }
        Ok(SubmitOutcome::Failed(e)) => {
            verbose(ctx, &format!("save failed: {}", e));
            eprintln!("Error: failed to save user");
            let _ = ctx
                .transcript
                .borrow_mut()
                .save_err(mode.as_str(), &id, &e.to_string());
        }
        Err(e) => println!("{}", e),
    }
}

fn handle_delete(ctx: &Context, id: &str) {
    let outcome = ctx
        .sync
        .borrow_mut()
        .remove(id, |user| ctx.confirmer.confirm_delete(user));

    match outcome {
        RemoveOutcome::Removed(user) => {
            println!("Deleted {} (@{})", user.id, user.username);
            let _ = ctx.transcript.borrow_mut().user_deleted(&user.id);
        }
        RemoveOutcome::Declined => {
            let _ = ctx.transcript.borrow_mut().delete_declined(id);
        }
        RemoveOutcome::NotFound => println!("No user with id {}", id),
        RemoveOutcome::Failed(e) => {
            // Logged only; the record stays in the list
            verbose(ctx, &format!("delete failed: {}", e));
            let _ = ctx.transcript.borrow_mut().delete_err(id, &e.to_string());
        }
    }
}

fn records_path(ctx: &Context) -> Option<PathBuf> {
    ctx.args
        .records
        .clone()
        .or_else(|| ctx.config.backup.records_file.clone())
}

fn handle_backup(ctx: &Context, explicit: Option<PathBuf>) {
    let records = match records_path(ctx) {
        Some(path) => match backup::load_records(&path) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("Backup failed: {:#}", e);
                return;
            }
        },
        None => Vec::new(),
    };

    let path = backup::resolve_path(
        explicit.as_deref(),
        ctx.config.backup.dir.as_deref(),
        Utc::now().date_naive(),
    );

    let sync = ctx.sync.borrow();
    match backup::write_backup(&path, sync.users(), &records) {
        Ok(bytes) => {
            println!(
                "Backup written to {} ({} users, {} records, {} bytes)",
                path.display(),
                sync.users().len(),
                records.len(),
                bytes
            );
            let _ = ctx
                .transcript
                .borrow_mut()
                .backup_written(&path, sync.users().len(), records.len());
        }
        Err(e) => eprintln!("Backup failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::CreatePayload;
    use crate::store::UserStore;
    use crate::user::Role;
    use anyhow::anyhow;
    use clap::Parser;
    use std::rc::Rc;

    /// In-memory store that hands out sequential ids
    #[derive(Default)]
    struct MemoryStore {
        users: Rc<RefCell<Vec<User>>>,
        fail_deletes: bool,
    }

    impl UserStore for MemoryStore {
        fn list(&self) -> Result<Vec<User>> {
            Ok(self.users.borrow().clone())
        }

        fn create(&self, payload: &CreatePayload) -> Result<User> {
            let mut users = self.users.borrow_mut();
            let user = User {
                id: format!("S{}", users.len() + 1),
                name: payload.name.clone(),
                username: payload.username.clone(),
                role: payload.role,
                hourly_rate: payload.hourly_rate,
                currency: payload.currency.clone(),
                country: payload.country.clone(),
                is_active: true,
                ..Default::default()
            };
            users.push(user.clone());
            Ok(user)
        }

        fn update(&self, user: &User) -> Result<Option<User>> {
            let mut users = self.users.borrow_mut();
            let slot = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or_else(|| anyhow!("API error 404: not found"))?;
            *slot = user.clone();
            Ok(Some(user.clone()))
        }

        fn delete(&self, id: &str) -> Result<()> {
            if self.fail_deletes {
                return Err(anyhow!("API error 500: nope"));
            }
            self.users.borrow_mut().retain(|u| u.id != id);
            Ok(())
        }
    }

    fn context(dir: &std::path::Path, store: MemoryStore, extra_args: &[&str]) -> Context {
        let mut argv = vec!["staffdesk", "--base-url", "http://store.test", "-c", "/stats"];
        argv.extend_from_slice(extra_args);
        let args = Args::parse_from(argv);
        let transcript =
            Transcript::new(&dir.join("session.jsonl"), "test", "http://store.test").unwrap();
        let mut config = Config::default();
        config.api.base_url = Some("http://store.test".to_string());
        config.backup.dir = Some(dir.to_path_buf());
        let ctx = Context {
            confirmer: Confirmer::new(true, args.yes),
            args,
            config,
            session_id: "test".to_string(),
            transcript: RefCell::new(transcript),
            sync: RefCell::new(SyncCoordinator::new(Box::new(store))),
            form: RefCell::new(FormState::new()),
        };
        load_users(&ctx);
        ctx
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::default();
        store.users.borrow_mut().push(User {
            id: "U1".to_string(),
            name: "Ana".to_string(),
            username: "ana".to_string(),
            role: Role::Employee,
            currency: "EUR".to_string(),
            country: "PT".to_string(),
            is_active: true,
            ..Default::default()
        });
        store
    }

    fn transcript_types(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("session.jsonl"))
            .unwrap()
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["type"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(None), "-");
        assert_eq!(format_days(Some(0)), "0d");
        assert_eq!(format_days(Some(42)), "42d");
        assert_eq!(format_days(Some(-3)), "expired 3d ago");
    }

    #[test]
    fn test_exit_and_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &[]);
        assert!(handle_command(&ctx, "/exit"));
        assert!(handle_command(&ctx, "/quit"));
        assert!(!handle_command(&ctx, "/bogus"));
        assert!(!handle_command(&ctx, "/set name \"unterminated"));
    }

    #[test]
    fn test_create_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &[]);

        handle_command(&ctx, "/new");
        handle_command(&ctx, "/set name \"Bob Costa\"");
        handle_command(&ctx, "/set username bob");
        handle_command(&ctx, "/set role support");
        handle_command(&ctx, "/set hourlyRate 10");
        handle_command(&ctx, "/save");

        assert!(!ctx.form.borrow().is_open());
        let sync = ctx.sync.borrow();
        assert_eq!(sync.users().len(), 2);
        let bob = &sync.users()[1];
        assert_eq!(bob.id, "S2");
        assert_eq!(bob.name, "Bob Costa");
        assert_eq!(bob.hourly_rate, 10.0);
        assert_eq!(projector::counts(sync.users()).support, 1);
        assert_eq!(transcript_types(dir.path()), vec!["load_ok", "user_saved"]);
    }

    #[test]
    fn test_invalid_save_keeps_form_open() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &[]);
        handle_command(&ctx, "/new");
        handle_command(&ctx, "/save");
        assert!(ctx.form.borrow().is_open());
        assert_eq!(ctx.sync.borrow().users().len(), 1);
    }

    #[test]
    fn test_edit_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &[]);
        handle_command(&ctx, "/edit U1");
        handle_command(&ctx, "/set email ana@example.com");
        handle_command(&ctx, "/save");

        let sync = ctx.sync.borrow();
        assert_eq!(sync.users().len(), 1);
        assert_eq!(sync.users()[0].email, "ana@example.com");
    }

    #[test]
    fn test_delete_requires_yes_in_one_shot_mode() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &[]);
        handle_command(&ctx, "/delete U1");
        assert_eq!(ctx.sync.borrow().users().len(), 1);
        assert_eq!(
            transcript_types(dir.path()),
            vec!["load_ok", "delete_declined"]
        );
    }

    #[test]
    fn test_delete_with_yes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), seeded(), &["--yes"]);
        handle_command(&ctx, "/delete U1");
        assert!(ctx.sync.borrow().users().is_empty());
    }

    #[test]
    fn test_failed_delete_is_logged_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = seeded();
        store.fail_deletes = true;
        let ctx = context(dir.path(), store, &["--yes"]);
        handle_command(&ctx, "/delete U1");
        assert_eq!(ctx.sync.borrow().users().len(), 1);
        assert_eq!(transcript_types(dir.path()), vec!["load_ok", "delete_err"]);
    }

    #[test]
    fn test_backup_writes_users_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        std::fs::write(&records, r#"[{"userId":"U1","hours":8}]"#).unwrap();
        let records_arg = records.to_string_lossy().to_string();
        let ctx = context(dir.path(), seeded(), &["--records", records_arg.as_str()]);

        let out = dir.path().join("out.json");
        handle_command(&ctx, &format!("/backup '{}'", out.display()));

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(saved["users"].as_array().unwrap().len(), 1);
        assert_eq!(saved["records"][0]["hours"], 8);
    }
}

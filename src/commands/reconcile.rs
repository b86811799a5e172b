//! Reconciliation commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Converge the server onto a template
//! - `destroy` - Remove what a template declares
//!
//! `apply` and `destroy` always plan first, show the plan and ask before
//! writing anything.

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::{
    ApplyResult, AutoConfirm, ConfirmCallback, DiffSummary, ExecuteOptions, Executor, NoProgress,
    ProgressCallback, Report, ResourceDiff,
};
use guacamole::HttpBackend;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::Context;
use crate::cli::{ApplyArgs, TemplateArgs};
use crate::config::{Settings, expand_path};
use crate::discovery::StaticDiscovery;
use crate::engine::differ::{display_plan, print_summary};
use crate::engine::{Desired, Expander, Outcome, Reconciler};
use crate::template::Template;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Apply,
    Destroy,
}

/// Everything one command needs
struct Session {
    settings: Settings,
    backend: HttpBackend,
    desired: Desired,
}

impl Session {
    fn open(config: Option<&str>, args: &TemplateArgs) -> Result<Self> {
        let settings = Settings::load(config)?;
        settings.validate()?;

        let discovery = match &args.addresses {
            Some(path) => StaticDiscovery::load(&expand_path(path))?,
            None => StaticDiscovery::new(),
        };
        let template = Template::load(&expand_path(&args.template))?;
        let desired = Expander::new(&discovery).expand(&template);

        let backend =
            HttpBackend::new(&settings.url, &settings.data_source, settings.token.clone());
        Ok(Self {
            settings,
            backend,
            desired,
        })
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(&self.backend)
            .with_protected_users(self.settings.protected_users.iter().cloned())
    }

    fn run(&self, mode: Mode, exec: &mut Executor<'_>) -> Result<Outcome> {
        let reconciler = self.reconciler();
        let outcome = match mode {
            Mode::Apply => reconciler.apply(&self.desired, exec),
            Mode::Destroy => reconciler.destroy(&self.desired, exec),
        };
        outcome.map_err(|e| {
            let advice = e.category().advice();
            anyhow::Error::new(e)
                .context(format!("Could not read the server state ({advice})"))
        })
    }

    fn plan(&self, mode: Mode) -> Result<Report> {
        let mut progress = NoProgress;
        let mut exec = Executor::new(ExecuteOptions::dry_run(), &mut progress);
        self.run(mode, &mut exec)?;
        Ok(exec.finish())
    }
}

/// Progress bar over the planned writes
struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    fn new(len: usize) -> Result<Self> {
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        Ok(Self { pb })
    }
}

impl ProgressCallback for BarProgress {
    fn on_resource_start(&mut self, diff: &ResourceDiff) {
        self.pb
            .set_message(format!("{} {}", diff.change, diff.resource_id));
    }

    fn on_resource_complete(&mut self, diff: &ResourceDiff, result: &ApplyResult) {
        if let ApplyResult::Failed { error } = result {
            self.pb.suspend(|| {
                ui::error(&format!(
                    "{} {} '{}': {}",
                    diff.change, diff.resource_type, diff.resource_id, error
                ));
            });
        }
        self.pb.inc(1);
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}

/// Asks on the terminal
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

pub fn plan(ctx: &Context, config: Option<&str>, args: &TemplateArgs) -> Result<()> {
    let session = Session::open(config, args)?;
    let report = session.plan(Mode::Apply)?;
    display_plan(&report.diffs());
    if !ctx.quiet {
        println!();
        ui::info("Plan only - no changes made");
    }
    Ok(())
}

pub fn apply(ctx: &Context, config: Option<&str>, args: &ApplyArgs) -> Result<()> {
    execute(ctx, config, args, Mode::Apply)
}

pub fn destroy(ctx: &Context, config: Option<&str>, args: &ApplyArgs) -> Result<()> {
    execute(ctx, config, args, Mode::Destroy)
}

fn execute(ctx: &Context, config: Option<&str>, args: &ApplyArgs, mode: Mode) -> Result<()> {
    let session = Session::open(config, &args.template)?;

    // 1. Plan and show what will change
    let planned = session.plan(mode)?.diffs();
    display_plan(&planned);
    let changes = DiffSummary::from_diffs(&planned);
    if !changes.has_changes() {
        return Ok(());
    }

    // 2. Confirm (unless --yes)
    let mut confirm: Box<dyn ConfirmCallback> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(PromptConfirm)
    };
    let prompt = match mode {
        Mode::Apply => "Continue?",
        Mode::Destroy => "Remove everything listed above?",
    };
    if !confirm.confirm(prompt)? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    // 3. Execute for real
    let delay = args
        .delay_ms
        .map_or_else(|| session.settings.delay(), Duration::from_millis);
    let mut progress = BarProgress::new(changes.total())?;
    let mut exec = Executor::new(ExecuteOptions::default().with_delay(delay), &mut progress);
    let outcome = session.run(mode, &mut exec)?;
    let report = exec.finish();
    drop(progress);

    // 4. Summary
    print_summary(&report.summary);
    if !outcome.generated_passwords.is_empty() {
        ui::section("Generated passwords");
        for (username, password) in &outcome.generated_passwords {
            ui::kv(username, password);
        }
        if !ctx.quiet {
            ui::dim("Passwords are shown once; they are never read back from the server.");
        }
    }

    if !report.summary.is_success() {
        bail!("{} operations failed", report.summary.failed);
    }
    Ok(())
}

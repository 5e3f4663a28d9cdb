//! Interactive batch editing of model read permissions.
//!
//! A run lists groups and models, lets the operator pick some of each with a
//! range expression, asks for confirmation and then updates the picked models
//! one at a time. A failed update is reported on its own line and the batch
//! moves on to the next model.

use crate::acl::{MergeMode, merge_group_ids};
use crate::api::{AclService, Group, Model, UpdatePayload, UpdateResponse};
use crate::selection::{Selection, parse_selection};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::io::{BufRead, Write};
use tracing::{info, warn};

/// Run-wide switches taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// List disabled models too.
    pub show_disabled: bool,
    /// How chosen groups combine with existing read groups.
    pub mode: MergeMode,
    /// Echo update requests and responses.
    pub debug: bool,
}

/// What happened to one selected model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// The service accepted the update; the model now has these read groups.
    Updated {
        /// Read groups sent to the service.
        group_ids: BTreeSet<String>,
    },
    /// The service answered with a status other than 200.
    Failed {
        /// Status code received.
        status: u16,
    },
    /// No response was received.
    Error {
        /// Transport error description.
        message: String,
    },
}

/// Result line for one selected model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResult {
    /// Position of the model in the displayed list.
    pub number: usize,
    /// Model identifier.
    pub model_id: String,
    /// Outcome of the update.
    pub status: ItemStatus,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The listing had no models to show.
    NoModels,
    /// The operator picked no models.
    NoModelsSelected,
    /// The operator declined the confirmation.
    Cancelled,
    /// Updates were issued; one entry per picked model, in order.
    Completed(Vec<ItemResult>),
}

struct GroupNames<'a>(HashMap<&'a str, &'a str>);

impl<'a> GroupNames<'a> {
    fn new(groups: &'a [Group]) -> Self {
        Self(
            groups
                .iter()
                .map(|group| (group.id.as_str(), group.name.as_str()))
                .collect(),
        )
    }

    // Unknown ids are shown as-is.
    fn join<'b>(&self, ids: impl IntoIterator<Item = &'b String>) -> String {
        ids.into_iter()
            .map(|id| self.0.get(id.as_str()).copied().unwrap_or(id.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Run one editing session against `service`.
///
/// Prompts are written to `output` and answers read from `input`; end of
/// input counts as an empty answer.
///
/// # Errors
///
/// Returns an error if groups or models cannot be listed, or if console I/O
/// fails. Failures of individual updates are reported in the outcome instead.
pub fn run<S, R, W>(
    service: &S,
    options: SessionOptions,
    input: &mut R,
    output: &mut W,
) -> Result<SessionOutcome>
where
    S: AclService + ?Sized,
    R: BufRead,
    W: Write,
{
    if options.debug {
        writeln!(output, "Fetching groups...")?;
    }
    let groups = service
        .list_groups()
        .context("Error connecting to server")?;
    if options.debug {
        writeln!(output, "Fetching models...")?;
    }
    let all_models = service
        .list_models()
        .context("Error connecting to server")?;

    let active_count = all_models.iter().filter(|model| model.is_active).count();
    let disabled_count = all_models.len() - active_count;
    let models: Vec<Model> = all_models
        .into_iter()
        .filter(|model| options.show_disabled || model.is_active)
        .collect();

    if models.is_empty() {
        writeln!(output, "No models found!")?;
        return Ok(SessionOutcome::NoModels);
    }

    write!(output, "\nFound {active_count} active models")?;
    if disabled_count > 0 {
        let visibility = if options.show_disabled { "shown" } else { "hidden" };
        write!(output, " ({disabled_count} disabled {visibility})")?;
    }
    writeln!(output)?;

    let names = GroupNames::new(&groups);

    writeln!(output, "\nAvailable groups:")?;
    for (number, group) in groups.iter().enumerate() {
        writeln!(
            output,
            "{}. {} ({})",
            number + 1,
            group.name,
            group.description
        )?;
    }

    let chosen_groups: Vec<&Group> = prompt_selection(
        input,
        output,
        "\nEnter group numbers (e.g., '1-3,5,7-9') or 'all' or press Enter for none: ",
        groups.len(),
    )?
    .map(|selection| {
        selection
            .pick(&groups)
            .into_iter()
            .map(|(_, group)| group)
            .collect()
    })
    .unwrap_or_default();

    writeln!(output, "\nAvailable models:")?;
    for (number, model) in models.iter().enumerate() {
        writeln!(output, "{}. {}", number + 1, describe_model(model, &names))?;
    }

    let Some(model_selection) = prompt_selection(
        input,
        output,
        "\nEnter model numbers (e.g., '1-3,5,7-9') or 'all': ",
        models.len(),
    )?
    else {
        writeln!(output, "No models selected")?;
        return Ok(SessionOutcome::NoModelsSelected);
    };
    let selected_models = model_selection.pick(&models);

    writeln!(output, "\nSummary:")?;
    writeln!(output, "Selected groups:")?;
    for group in &chosen_groups {
        writeln!(output, "- {}", group.name)?;
    }
    writeln!(output, "\nSelected models:")?;
    for (number, model) in &selected_models {
        writeln!(output, "- [{number}] {}", describe_model(model, &names))?;
    }
    writeln!(output, "\nMode: {} groups", options.mode)?;

    let answer = ask(input, output, "\nProceed with these changes? (y/N): ")?;
    if !answer.eq_ignore_ascii_case("y") {
        writeln!(output, "Operation cancelled")?;
        return Ok(SessionOutcome::Cancelled);
    }

    let chosen_ids: BTreeSet<String> = chosen_groups.iter().map(|group| group.id.clone()).collect();
    let results = apply_updates(
        service,
        options,
        &selected_models,
        &chosen_ids,
        &names,
        output,
    )?;
    Ok(SessionOutcome::Completed(results))
}

fn apply_updates<S, W>(
    service: &S,
    options: SessionOptions,
    selected: &[(usize, &Model)],
    chosen_ids: &BTreeSet<String>,
    names: &GroupNames<'_>,
    output: &mut W,
) -> Result<Vec<ItemResult>>
where
    S: AclService + ?Sized,
    W: Write,
{
    writeln!(output, "\nUpdating models...")?;
    let total = selected.len();
    let mut results = Vec::with_capacity(total);

    for (position, (number, model)) in selected.iter().enumerate() {
        let position = position + 1;
        let group_ids = merge_group_ids(
            model.access_control.read_group_ids(),
            chosen_ids,
            options.mode,
        );
        let payload = UpdatePayload::new(model, group_ids.clone(), Utc::now().timestamp());

        if options.debug {
            writeln!(output, "\nSending update request for {}:", payload.name)?;
            writeln!(output, "Request URL: {}", service.update_url(&model.id))?;
            writeln!(output, "Request payload:")?;
            writeln!(
                output,
                "{}",
                serde_json::to_string_pretty(&payload).context("Failed to render payload")?
            )?;
        }

        let status = match service.update_model(&payload) {
            Ok(response) => {
                if options.debug {
                    echo_response(&response, output)?;
                }
                let outcome = if response.is_success() { "Success" } else { "Failed" };
                writeln!(
                    output,
                    "[{position}/{total}][#{number}] Updating [{}] {}: {outcome}",
                    model.id, model.name
                )?;
                if response.is_success() {
                    writeln!(output, "  Final groups: {}", names.join(&group_ids))?;
                    info!(model = %model.id, "Read groups updated");
                    ItemStatus::Updated { group_ids }
                } else {
                    warn!(model = %model.id, status = response.status, "Update rejected");
                    ItemStatus::Failed {
                        status: response.status,
                    }
                }
            }
            Err(err) => {
                writeln!(
                    output,
                    "[{position}/{total}][#{number}] Error updating [{}] {}: {err:#}",
                    model.id, model.name
                )?;
                warn!(model = %model.id, error = %err, "Update failed");
                ItemStatus::Error {
                    message: format!("{err:#}"),
                }
            }
        };

        results.push(ItemResult {
            number: *number,
            model_id: model.id.clone(),
            status,
        });
    }

    Ok(results)
}

fn describe_model(model: &Model, names: &GroupNames<'_>) -> String {
    let status = if model.is_active { "" } else { " [DISABLED]" };
    let current = model.access_control.read_group_ids();
    let groups_info = if current.is_empty() {
        String::new()
    } else {
        format!(" (Current groups: {})", names.join(current))
    };
    format!("[{}] {}{status}{groups_info}", model.id, model.name)
}

fn echo_response<W: Write>(response: &UpdateResponse, output: &mut W) -> Result<()> {
    writeln!(output, "Response status: {}", response.status)?;
    writeln!(output, "Response body:")?;
    let body = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| response.body.clone());
    writeln!(output, "{body}")?;
    Ok(())
}

// Re-asks until the answer is in bounds. `None` means an empty answer.
fn prompt_selection<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    max: usize,
) -> Result<Option<Selection>> {
    loop {
        let answer = ask(input, output, prompt)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match parse_selection(&answer, max) {
            Ok(selection) => {
                for warning in selection.warnings() {
                    writeln!(output, "{warning}")?;
                }
                return Ok(Some(selection));
            }
            Err(err) => writeln!(output, "Error: {err}")?,
        }
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AccessControl, Permission};
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::io::Cursor;

    #[derive(Default)]
    struct FakeService {
        groups: Vec<Group>,
        models: Vec<Model>,
        offline: bool,
        unreachable: Vec<&'static str>,
        rejected: Vec<&'static str>,
        updates: RefCell<Vec<UpdatePayload>>,
    }

    impl AclService for FakeService {
        fn list_groups(&self) -> Result<Vec<Group>> {
            if self.offline {
                bail!("connection refused");
            }
            Ok(self.groups.clone())
        }

        fn list_models(&self) -> Result<Vec<Model>> {
            Ok(self.models.clone())
        }

        fn update_model(&self, payload: &UpdatePayload) -> Result<UpdateResponse> {
            self.updates.borrow_mut().push(payload.clone());
            if self.unreachable.contains(&payload.id.as_str()) {
                bail!("connection reset by peer");
            }
            let status = if self.rejected.contains(&payload.id.as_str()) {
                500
            } else {
                200
            };
            Ok(UpdateResponse {
                status,
                body: r#"{"ok":true}"#.to_string(),
            })
        }

        fn update_url(&self, model_id: &str) -> String {
            format!("http://fake/update?id={model_id}")
        }
    }

    fn group(id: &str, name: &str) -> Group {
        Group {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} members"),
        }
    }

    fn model(id: &str, is_active: bool, read_groups: &[&str]) -> Model {
        Model {
            id: id.to_string(),
            name: id.to_uppercase(),
            object: "model".to_string(),
            created: 1_700_000_000,
            owned_by: "openai".to_string(),
            is_active,
            access_control: AccessControl::read_groups_only(
                read_groups.iter().map(ToString::to_string).collect(),
            ),
            pipe: None,
        }
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn fixture() -> FakeService {
        FakeService {
            groups: vec![
                group("g1", "Staff"),
                group("g2", "Research"),
                group("g3", "Admins"),
            ],
            models: vec![
                model("m1", true, &[]),
                model("m2", true, &["g3"]),
                model("m3", false, &["g1"]),
                model("m4", true, &["g2", "external"]),
                model("m5", true, &[]),
            ],
            ..FakeService::default()
        }
    }

    fn run_with(
        service: &FakeService,
        options: SessionOptions,
        answers: &str,
    ) -> Result<(SessionOutcome, String)> {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let outcome = run(service, options, &mut input, &mut output)?;
        Ok((outcome, String::from_utf8_lossy(&output).into_owned()))
    }

    #[test]
    fn test_append_to_all_visible_models() -> Result<()> {
        let service = fixture();
        let (outcome, output) = run_with(&service, SessionOptions::default(), "1-2\nall\ny\n")?;

        assert!(output.contains("Found 4 active models (1 disabled hidden)"));
        assert!(!output.contains("[m3]"));
        assert!(output.contains("Mode: Append groups"));

        let updates = service.updates.borrow();
        let updated: Vec<&str> = updates.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(updated, vec!["m1", "m2", "m4", "m5"]);

        let expected = [
            ids(&["g1", "g2"]),
            ids(&["g1", "g2", "g3"]),
            ids(&["external", "g1", "g2"]),
            ids(&["g1", "g2"]),
        ];
        for (payload, expected) in updates.iter().zip(&expected) {
            assert_eq!(
                payload.access_control,
                AccessControl::read_groups_only(expected.clone())
            );
            assert!(payload.is_active);
            assert_eq!(payload.updated_at, payload.created_at);
        }

        match outcome {
            SessionOutcome::Completed(results) => {
                assert_eq!(results.len(), 4);
                assert_eq!(results[2].number, 3);
                assert_eq!(results[2].model_id, "m4");
                assert_eq!(
                    results[2].status,
                    ItemStatus::Updated {
                        group_ids: ids(&["external", "g1", "g2"])
                    }
                );
            }
            other => bail!("unexpected outcome {other:?}"),
        }

        assert!(output.contains("[3/4][#3] Updating [m4] M4: Success"));
        assert!(output.contains("  Final groups: external, Staff, Research"));
        Ok(())
    }

    #[test]
    fn test_update_sends_exactly_the_read_groups() -> Result<()> {
        let mut shared = model("shared", true, &["g3"]);
        shared.access_control.read.user_ids = ids(&["u1"]);
        shared.access_control.write = Permission {
            group_ids: ids(&["g3"]),
            user_ids: ids(&["u2"]),
        };
        let service = FakeService {
            groups: vec![group("g1", "Staff"), group("g3", "Admins")],
            models: vec![shared],
            ..FakeService::default()
        };
        run_with(&service, SessionOptions::default(), "1\n1\ny\n")?;

        let updates = service.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].access_control,
            AccessControl {
                read: Permission {
                    group_ids: ids(&["g1", "g3"]),
                    user_ids: BTreeSet::new(),
                },
                write: Permission::default(),
            }
        );
        Ok(())
    }

    #[test]
    fn test_shown_disabled_model_is_reenabled() -> Result<()> {
        let service = fixture();
        let options = SessionOptions {
            show_disabled: true,
            ..SessionOptions::default()
        };
        let (_, output) = run_with(&service, options, "2\n3\ny\n")?;

        assert!(output.contains("Found 4 active models (1 disabled shown)"));
        assert!(output.contains("3. [m3] M3 [DISABLED] (Current groups: Staff)"));

        let updates = service.updates.borrow();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "m3");
        assert!(updates[0].is_active);
        assert_eq!(updates[0].access_control.read_group_ids(), &ids(&["g1", "g2"]));
        Ok(())
    }

    #[test]
    fn test_replace_with_no_groups_clears_read_access() -> Result<()> {
        let service = fixture();
        let options = SessionOptions {
            mode: MergeMode::Replace,
            ..SessionOptions::default()
        };
        let (_, output) = run_with(&service, options, "\n2,4\nY\n")?;

        assert!(output.contains("Mode: Replace groups"));
        let updates = service.updates.borrow();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|p| p.access_control.read_group_ids().is_empty()));
        Ok(())
    }

    #[test]
    fn test_out_of_bounds_reprompts() -> Result<()> {
        let service = fixture();
        let (_, output) = run_with(&service, SessionOptions::default(), "0-3\n1\n9\n1\ny\n")?;

        assert!(output.contains("Error: Range 0-3 is out of bounds (1-3)"));
        assert!(output.contains("Error: Number 9 is out of bounds (1-4)"));
        assert_eq!(service.updates.borrow().len(), 1);
        Ok(())
    }

    #[test]
    fn test_malformed_range_reprompts() -> Result<()> {
        let service = fixture();
        let (_, output) = run_with(&service, SessionOptions::default(), "1-2-3\n2\n1\ny\n")?;

        assert!(output.contains("Error: Malformed range 1-2-3: expected start-end"));
        assert_eq!(
            service.updates.borrow()[0].access_control.read_group_ids(),
            &ids(&["g2"])
        );
        Ok(())
    }

    #[test]
    fn test_invalid_tokens_are_reported_and_skipped() -> Result<()> {
        let service = fixture();
        let (_, output) = run_with(&service, SessionOptions::default(), "1,x\n1\ny\n")?;

        assert!(output.contains("Invalid number: x"));
        assert_eq!(
            service.updates.borrow()[0].access_control.read_group_ids(),
            &ids(&["g1"])
        );
        Ok(())
    }

    #[test]
    fn test_empty_model_answer_stops() -> Result<()> {
        let service = fixture();
        let (outcome, output) = run_with(&service, SessionOptions::default(), "1\n\n")?;

        assert_eq!(outcome, SessionOutcome::NoModelsSelected);
        assert!(output.contains("No models selected"));
        assert!(service.updates.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_declined_confirmation_cancels() -> Result<()> {
        let service = fixture();
        let (outcome, output) = run_with(&service, SessionOptions::default(), "1\nall\nn\n")?;

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(output.contains("Operation cancelled"));
        assert!(service.updates.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_end_of_input_cancels() -> Result<()> {
        let service = fixture();
        let (outcome, _) = run_with(&service, SessionOptions::default(), "1\nall\n")?;

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(service.updates.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_item_failures_do_not_stop_the_batch() -> Result<()> {
        let service = FakeService {
            unreachable: vec!["m1"],
            rejected: vec!["m2"],
            ..fixture()
        };
        let (outcome, output) = run_with(&service, SessionOptions::default(), "1\n1-3\ny\n")?;

        assert!(output.contains("[1/3][#1] Error updating [m1] M1: connection reset by peer"));
        assert!(output.contains("[2/3][#2] Updating [m2] M2: Failed"));
        assert!(output.contains("[3/3][#3] Updating [m4] M4: Success"));

        let SessionOutcome::Completed(results) = outcome else {
            bail!("batch did not complete");
        };
        assert!(matches!(results[0].status, ItemStatus::Error { .. }));
        assert_eq!(results[1].status, ItemStatus::Failed { status: 500 });
        assert!(matches!(results[2].status, ItemStatus::Updated { .. }));
        Ok(())
    }

    #[test]
    fn test_no_visible_models() -> Result<()> {
        let service = FakeService {
            groups: vec![group("g1", "Staff")],
            models: vec![model("m1", false, &[])],
            ..FakeService::default()
        };
        let (outcome, output) = run_with(&service, SessionOptions::default(), "")?;

        assert_eq!(outcome, SessionOutcome::NoModels);
        assert!(output.contains("No models found!"));
        Ok(())
    }

    #[test]
    fn test_listing_failure_is_fatal() {
        let service = FakeService {
            offline: true,
            ..fixture()
        };
        let result = run_with(&service, SessionOptions::default(), "1\nall\ny\n");

        assert!(result.is_err());
        if let Err(err) = result {
            let message = format!("{err:#}");
            assert!(message.contains("Error connecting to server"));
            assert!(message.contains("connection refused"));
        }
    }

    #[test]
    fn test_debug_echoes_request_and_response() -> Result<()> {
        let service = fixture();
        let options = SessionOptions {
            debug: true,
            ..SessionOptions::default()
        };
        let (_, output) = run_with(&service, options, "1\n1\ny\n")?;

        assert!(output.contains("Fetching groups..."));
        assert!(output.contains("Sending update request for M1:"));
        assert!(output.contains("Request URL: http://fake/update?id=m1"));
        assert!(output.contains("\"toolIds\": ["));
        assert!(output.contains("Response status: 200"));
        assert!(output.contains("\"ok\": true"));
        Ok(())
    }
}

// Copyright (c) Microsoft Corporation. All rights reserved.

//! Integration tests driving `P4Client` against a scripted in-process server.

mod common;

use std::sync::{Arc, Mutex};

use common::{connect, info, message, serve, stat, Log, ServerInfo, Step};
use p4_sdk::*;
use serde_json::json;

fn client_form(name: &str) -> Step {
    stat(json!({
        "Client": name,
        "Owner": "bruno",
        "Root": "/home/bruno/ws",
        "Options": "noallwrite noclobber nocompress unlocked nomodtime normdir",
        "Description": "Created by bruno.\n",
        "View0": "//depot/main/... //bruno_ws/main/...",
        "View1": "-//depot/main/secret/... //bruno_ws/main/secret/...",
        "Backup": "enable"
    }))
}

// ============================================================================
// Dispatch and exception policy
// ============================================================================

#[tokio::test]
async fn test_run_info_returns_records() {
    let (mut p4, log) = connect(|params| match params.command.as_str() {
        "info" => vec![stat(json!({
            "userName": "bruno",
            "serverRoot": "/p4/root",
            "serverVersion": "P4D/LINUX26X86_64/2024.1/2596294"
        }))],
        _ => vec![],
    })
    .await;

    assert!(p4.connected());
    assert_eq!(p4.server_level(), Some(57));

    let result = p4.run_info().await.unwrap();
    let record = result.records().next().unwrap();
    assert_eq!(record.get_str("serverRoot"), Some("/p4/root"));

    let sent = log.commands();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].tagged);
    assert_eq!(sent[0].user.as_deref(), Some("bruno"));
    assert_eq!(sent[0].client.as_deref(), Some("bruno_ws"));
}

#[tokio::test]
async fn test_errors_fail_the_command_and_are_kept() {
    let (mut p4, _log) = connect(|_| {
        vec![message(3, 7105, "//nope/... - no such file(s).\n")]
    })
    .await;

    let err = p4.run("sync", &["//nope/..."]).await.unwrap_err();
    assert!(matches!(err, P4Error::Protocol { .. }));
    assert_eq!(err.errors(), ["//nope/... - no such file(s)."]);
    assert!(err
        .to_string()
        .starts_with("[P4#run] Errors during command execution( \"p4 sync //nope/...\" )"));

    assert_eq!(p4.errors(), ["//nope/... - no such file(s)."]);
    assert_eq!(p4.messages()[0].severity, Severity::Failed);
}

#[tokio::test]
async fn test_exception_levels() {
    let (mut p4, _log) = connect(|params| match params.command.as_str() {
        "sync" => vec![message(2, 6532, "//bruno_ws/... - file(s) up-to-date.\n")],
        "edit" => vec![message(3, 7105, "a.c - file(s) not on client.\n")],
        _ => vec![],
    })
    .await;

    // RaiseAll fails on warnings
    assert!(p4.run("sync", &[]).await.is_err());

    p4.set_exception_level(ExceptionLevel::RaiseErrors);
    let result = p4.run("sync", &[]).await.unwrap();
    assert_eq!(result.warnings, ["//bruno_ws/... - file(s) up-to-date."]);
    assert!(p4.run("edit", &["a.c"]).await.is_err());

    p4.set_exception_level(ExceptionLevel::RaiseNone);
    let result = p4.run("sync", &[]).await.unwrap();
    assert_eq!(result.messages[0].msgid, 6532);
    assert_eq!(result.messages[0].generic, Generic::Unknown);
    let result = p4.run("edit", &["a.c"]).await.unwrap();
    assert!(result.has_errors());
    assert_eq!(p4.errors().len(), 1);
    assert!(p4.warnings().is_empty());
}

#[tokio::test]
async fn test_json_rpc_failure_is_returned() {
    let (mut p4, _log) = connect(|_| vec![Step::Fail(-32000, "server exploded")]).await;

    let err = p4.run("info", &[]).await.unwrap_err();
    assert!(matches!(err, P4Error::JsonRpc { code: -32000, .. }));
    assert!(p4.connected());
}

#[tokio::test]
async fn test_failed_command_replaces_last_result() {
    let (mut p4, _log) = connect(|params| match params.command.as_str() {
        "sync" => vec![message(2, 6532, "//bruno_ws/... - file(s) up-to-date.\n")],
        _ => vec![
            info("partial output"),
            message(3, 1, "partial error\n"),
            Step::Fail(-32000, "server exploded"),
        ],
    })
    .await;
    p4.set_exception_level(ExceptionLevel::RaiseNone);

    p4.run("sync", &[]).await.unwrap();
    assert_eq!(p4.warnings().len(), 1);

    let err = p4.run("info", &[]).await.unwrap_err();
    assert!(matches!(err, P4Error::JsonRpc { code: -32000, .. }));
    assert!(p4.warnings().is_empty());
    assert_eq!(p4.errors().len(), 2);
    assert_eq!(p4.errors()[0], "partial error");
    assert!(p4.errors()[1].contains("server exploded"));
    assert_eq!(p4.last_result().command, "info");
    assert_eq!(p4.last_result().info().collect::<Vec<_>>(), ["partial output"]);
    assert_eq!(p4.messages().len(), 1);
}

#[tokio::test]
async fn test_fatal_message_disconnects() {
    let (mut p4, _log) = connect(|_| vec![message(4, 1, "Server shutting down.\n")]).await;

    assert!(p4.run("info", &[]).await.is_err());
    assert!(!p4.connected());
    assert_eq!(p4.errors(), ["Server shutting down."]);
    assert!(matches!(p4.run("info", &[]).await, Err(P4Error::NotConnected)));
}

#[tokio::test]
async fn test_protocol_mismatch_fails_connect() {
    let mut p4 = P4Client::default();
    let server = ServerInfo {
        protocol_version: 99,
        ..Default::default()
    };
    let err = serve(&mut p4, server, |_| vec![]).await.err().unwrap();

    assert!(matches!(
        err,
        P4Error::ProtocolMismatch {
            expected: 1,
            actual: Some(99)
        }
    ));
    assert_eq!(p4.state(), ConnectionState::Error);
    assert!(!p4.connected());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_properties_apply_to_next_command() {
    let (mut p4, log) = connect(|_| vec![]).await;

    p4.set_charset("utf8").unwrap();
    p4.set_user("alice");
    p4.set_tagged(false);
    p4.set_max_results(500);
    p4.run("changes", &["-m1"]).await.unwrap();

    let sent = log.commands();
    let last = sent.last().unwrap();
    assert_eq!(last.charset.as_deref(), Some("utf8"));
    assert_eq!(last.user.as_deref(), Some("alice"));
    assert!(!last.tagged);
    assert_eq!(last.max_results, Some(500));
    assert_eq!(last.args, ["-m1"]);
}

#[tokio::test]
async fn test_port_and_track_are_fixed_while_connected() {
    let (mut p4, _log) = connect(|_| vec![]).await;

    assert!(matches!(p4.set_port("other:1666"), Err(P4Error::Usage(_))));
    assert!(matches!(p4.set_track(true), Err(P4Error::Usage(_))));
    assert!(!p4.track());

    p4.disconnect().await;
    assert!(!p4.connected());
    p4.set_track(true).unwrap();
    assert!(p4.track());
}

#[tokio::test]
async fn test_track_output() {
    let mut p4 = P4Client::default();
    p4.set_track(true).unwrap();
    let log = serve(&mut p4, ServerInfo::default(), |_| {
        vec![Step::Complete(vec![
            "rpc.msgs 3".to_string(),
            "db.counters 1 0".to_string(),
        ])]
    })
    .await
    .unwrap();

    let result = p4.run("info", &[]).await.unwrap();
    assert_eq!(result.track.len(), 2);
    assert_eq!(p4.track_output(), ["rpc.msgs 3", "db.counters 1 0"]);

    let messages = log.messages();
    let handshake = &messages[0];
    assert_eq!(handshake["method"], "protocol.handshake");
    assert_eq!(handshake["params"]["track"], true);
}

// ============================================================================
// Output handler and progress
// ============================================================================

#[derive(Clone, Default)]
struct Counting {
    stats: Arc<Mutex<usize>>,
    verdict: HandlerResult,
}

impl OutputHandler for Counting {
    fn output_stat(&mut self, _record: &Record) -> HandlerResult {
        *self.stats.lock().unwrap() += 1;
        self.verdict
    }

    fn output_message(&mut self, _message: &Message) -> HandlerResult {
        HandlerResult::Handled
    }
}

fn three_files() -> Vec<Step> {
    (1..=3)
        .map(|i| stat(json!({ "depotFile": format!("//depot/f{}.c", i), "rev": i })))
        .collect()
}

#[tokio::test]
async fn test_handled_output_is_not_buffered() {
    let (mut p4, _log) = connect(|_| {
        let mut steps = three_files();
        steps.push(message(3, 7105, "a.c - no such file(s).\n"));
        steps
    })
    .await;

    let handler = Counting {
        verdict: HandlerResult::Handled,
        ..Default::default()
    };
    let stats = Arc::clone(&handler.stats);
    p4.set_handler(handler);

    let result = p4.run("files", &["//depot/..."]).await.unwrap();
    assert_eq!(*stats.lock().unwrap(), 3);
    assert!(result.output.is_empty());
    // Handled messages are not recorded anywhere
    assert!(result.errors.is_empty());
    assert!(result.messages.is_empty());
}

#[tokio::test]
async fn test_reported_output_is_buffered() {
    let (mut p4, _log) = connect(|_| three_files()).await;

    let handler = Counting::default();
    let stats = Arc::clone(&handler.stats);
    assert!(p4.set_handler(handler).is_none());

    let result = p4.run("files", &["//depot/..."]).await.unwrap();
    assert_eq!(*stats.lock().unwrap(), 3);
    assert_eq!(result.records().count(), 3);
    assert!(p4.clear_handler().is_some());
}

#[tokio::test]
async fn test_cancel_stops_the_command() {
    let (mut p4, log) = connect(|params| match params.command.as_str() {
        "files" => {
            let mut steps = three_files();
            steps.push(Step::AwaitCancel);
            steps.extend(three_files());
            steps
        }
        _ => vec![info("still here")],
    })
    .await;

    let handler = Counting {
        verdict: HandlerResult::Cancel,
        ..Default::default()
    };
    let stats = Arc::clone(&handler.stats);
    p4.set_handler(handler);

    let err = p4.run("files", &["//depot/..."]).await.unwrap_err();
    assert!(matches!(err, P4Error::Cancelled { .. }));
    assert_eq!(*stats.lock().unwrap(), 1);
    assert!(log.saw_method("command.cancel"));

    // The session stays usable
    p4.clear_handler();
    let result = p4.run("info", &[]).await.unwrap();
    assert_eq!(result.info().collect::<Vec<_>>(), ["still here"]);
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Progress for Recorder {
    fn init(&mut self, kind: i32) {
        self.0.lock().unwrap().push(format!("init {}", kind));
    }

    fn set_total(&mut self, total: i64) {
        self.0.lock().unwrap().push(format!("total {}", total));
    }

    fn update(&mut self, position: i64) {
        self.0.lock().unwrap().push(format!("update {}", position));
    }

    fn done(&mut self, failed: bool) {
        self.0.lock().unwrap().push(format!("done {}", failed));
    }
}

#[tokio::test]
async fn test_progress_events_are_delivered() {
    let (mut p4, log) = connect(|_| {
        vec![
            Step::Progress(json!({ "type": "init", "kind": 1 })),
            Step::Progress(json!({ "type": "total", "total": 2 })),
            Step::Progress(json!({ "type": "update", "position": 1 })),
            Step::Progress(json!({ "type": "update", "position": 2 })),
            Step::Progress(json!({ "type": "done", "failed": false })),
        ]
    })
    .await;

    let recorder = Recorder::default();
    p4.set_progress(recorder.clone());
    p4.run("sync", &[]).await.unwrap();

    assert_eq!(
        *recorder.0.lock().unwrap(),
        ["init 1", "total 2", "update 1", "update 2", "done false"]
    );
    assert!(log.commands()[0].progress);
}

// ============================================================================
// Resolve
// ============================================================================

fn text_merge(file: &str) -> Step {
    Step::Request(
        "command.resolve",
        json!({
            "merge": {
                "yourName": format!("//bruno_ws/{}", file),
                "theirName": format!("//depot/main/{}#3", file),
                "baseName": format!("//depot/main/{}#2", file),
                "yourPath": format!("/home/bruno/ws/{}", file),
                "theirPath": "/tmp/t1",
                "basePath": "/tmp/b1",
                "resultPath": "/tmp/r1",
                "mergeHint": "am"
            }
        }),
    )
}

#[tokio::test]
async fn test_text_resolve_uses_resolver() {
    let (mut p4, log) = connect(|_| vec![text_merge("a.c"), text_merge("b.c")]).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let names = Arc::clone(&seen);
    let mut resolver = move |merge: &MergeData| {
        names.lock().unwrap().push(merge.your_name.clone());
        Ok::<_, P4Error>(ResolveAction::AcceptTheirs)
    };
    p4.run_resolve(&mut resolver, &[]).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), ["//bruno_ws/a.c", "//bruno_ws/b.c"]);
    let replies = log.replies();
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|r| r["result"]["action"] == "at"));
}

#[tokio::test]
async fn test_resolve_without_resolver_takes_hint() {
    let (mut p4, log) = connect(|_| vec![text_merge("a.c")]).await;

    p4.run("resolve", &[]).await.unwrap();
    assert_eq!(log.replies()[0]["result"]["action"], "am");
}

#[tokio::test]
async fn test_binary_resolve() {
    let (mut p4, _log) = connect(|_| {
        vec![Step::Request(
            "command.resolve",
            json!({
                "merge": {
                    "yourName": "",
                    "theirName": "",
                    "baseName": "",
                    "yourPath": "/home/bruno/ws/logo.png",
                    "theirPath": "/tmp/t2",
                    "mergeHint": "at",
                    "binary": true
                }
            }),
        )]
    })
    .await;

    let binary = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&binary);
    p4.set_resolver(move |merge: &MergeData| {
        *seen.lock().unwrap() = Some(merge.clone());
        Ok::<_, P4Error>(ResolveAction::AcceptYours)
    });
    p4.run("resolve", &[]).await.unwrap();

    let merge = binary.lock().unwrap().clone().unwrap();
    assert!(merge.binary);
    assert!(merge.your_name.is_empty());
    assert!(merge.their_path.is_some());
    assert!(merge.base_path.is_none());
}

struct SkipActions;

impl Resolver for SkipActions {
    fn resolve(&mut self, merge: &MergeData) -> Result<ResolveAction, P4Error> {
        Ok(merge.merge_hint)
    }

    fn action_resolve(&mut self, merge: &ActionMergeData) -> Result<ResolveAction, P4Error> {
        assert_eq!(merge.resolve_type, "Filetype resolve");
        Ok(ResolveAction::Skip)
    }
}

#[tokio::test]
async fn test_action_resolve() {
    let (mut p4, log) = connect(|_| {
        vec![Step::Request(
            "command.actionResolve",
            json!({
                "merge": {
                    "mergeAction": "(text+wx)",
                    "yoursAction": "(text+w)",
                    "theirAction": "(text+x)",
                    "type": "Filetype resolve",
                    "mergeHint": "am",
                    "info": { "clientFile": "/home/bruno/ws/a.sh" }
                }
            }),
        )]
    })
    .await;

    p4.set_resolver(SkipActions);
    p4.run("resolve", &[]).await.unwrap();
    assert_eq!(log.replies()[0]["result"]["action"], "s");
}

#[tokio::test]
async fn test_resolver_error_aborts_resolve() {
    let (mut p4, log) = connect(|_| vec![text_merge("a.c"), text_merge("b.c")]).await;

    let mut resolver =
        |_: &MergeData| Err::<ResolveAction, _>(P4Error::Resolve("merge tool crashed".into()));
    let err = p4.run_resolve(&mut resolver, &[]).await.unwrap_err();

    assert!(matches!(err, P4Error::Resolve(_)));
    let replies = log.replies();
    assert_eq!(replies[0]["error"]["code"], -32603);
    // Later resolves are quit without asking the resolver
    assert_eq!(replies[1]["result"]["action"], "q");
}

// ============================================================================
// Prompts and input
// ============================================================================

#[tokio::test]
async fn test_login_answers_prompt() {
    let (mut p4, log) = connect(|_| {
        vec![
            Step::Request(
                "command.prompt",
                json!({ "prompt": "Enter password: ", "noEcho": true }),
            ),
            info("User bruno logged in."),
        ]
    })
    .await;

    let result = p4.run_login(Some("s3cret"), &[]).await.unwrap();
    assert_eq!(result.info().next(), Some("User bruno logged in."));
    assert_eq!(log.replies()[0]["result"]["response"], "s3cret");
}

#[tokio::test]
async fn test_password_change_answers_three_prompts() {
    let prompt = |text: &str| Step::Request("command.prompt", json!({ "prompt": text }));
    let (mut p4, log) = connect(move |_| {
        vec![
            prompt("Enter old password: "),
            prompt("Enter new password: "),
            prompt("Re-enter new password: "),
        ]
    })
    .await;

    p4.run_password("old", "new").await.unwrap();
    let answers: Vec<_> = log
        .replies()
        .iter()
        .map(|r| r["result"]["response"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(answers, ["old", "new", "new"]);
    assert_eq!(log.commands()[0].command, "passwd");
}

// ============================================================================
// Specs
// ============================================================================

#[tokio::test]
async fn test_fetch_modify_save_client() {
    let (mut p4, log) = connect(|params| match (params.command.as_str(), params.args.as_slice()) {
        ("client", [flag, ..]) if flag == "-o" => vec![client_form("bruno_ws")],
        ("client", [flag]) if flag == "-i" => vec![
            Step::Request("command.input", json!({})),
            info("Client bruno_ws saved."),
        ],
        _ => vec![],
    })
    .await;

    let mut client = p4.fetch_client(Some("bruno_ws")).await.unwrap();
    assert_eq!(client.name(), Some("bruno_ws"));
    assert_eq!(client.view().unwrap().len(), 2);
    assert_eq!(client.unknown_fields()[0].name, "Backup");

    client.set_root("/work/bruno").unwrap();
    client.set_description("Build workspace\n").unwrap();
    assert!(matches!(client.set("Colour", "blue"), Err(P4Error::Usage(_))));

    let result = p4.save_client(&client).await.unwrap();
    assert_eq!(result.info().next(), Some("Client bruno_ws saved."));

    let replies = log.replies();
    let form = replies[0]["result"]["data"].as_str().unwrap();
    assert!(form.contains("Root:\t/work/bruno\n"));
    assert!(form.contains("Description:\n\tBuild workspace\n"));
    assert!(form.contains("View:\n\t//depot/main/... //bruno_ws/main/...\n"));
    assert!(form.contains("Backup:\tenable"));

    let sent = log.commands();
    assert_eq!(sent[0].args, ["-o", "bruno_ws"]);
    assert!(sent[0].tagged);
    assert_eq!(sent[1].args, ["-i"]);
}

#[tokio::test]
async fn test_rejected_save_reports_errors() {
    let (mut p4, _log) = connect(|_| {
        vec![
            Step::Request("command.input", json!({})),
            message(3, 836, "Error in client specification.\nMissing required field 'Root'.\n"),
        ]
    })
    .await;

    let client = Spec::new(SpecKind::Client);
    let err = p4.save_client(&client).await.unwrap_err();
    assert!(matches!(err, P4Error::Protocol { .. }));
    assert_eq!(p4.errors().len(), 1);
    assert!(p4.errors()[0].contains("Missing required field"));

    let label = Spec::new(SpecKind::Label);
    assert!(matches!(p4.save_client(&label).await, Err(P4Error::Usage(_))));
}

#[tokio::test]
async fn test_fetch_form_text_with_specdef() {
    let (mut p4, _log) = connect(|_| {
        vec![stat(json!({
            "specdef": "Label;code:401;rq;ro;len:32;;Owner;code:404;len:32;;Revision;code:408;type:word;len:64;;View;code:407;type:wlist;len:64;;",
            "data": "# A label form\n\nLabel:\tv1.0\n\nOwner:\tbruno\n\nRevision:\t@2024/01/01\n\nView:\n\t//depot/main/...\n"
        }))]
    })
    .await;

    let label = p4.fetch_label(Some("v1.0")).await.unwrap();
    assert_eq!(label.name(), Some("v1.0"));
    assert_eq!(label.get_str("revision"), Some("@2024/01/01"));
    assert_eq!(label.view().unwrap(), ["//depot/main/..."]);

    // The server's definition is used for local parsing from now on
    assert_eq!(p4.spec_def(SpecKind::Label).fields().len(), 4);
    let parsed = p4
        .parse_spec(SpecKind::Label, &p4.format_spec(&label))
        .unwrap();
    assert_eq!(parsed.get_str("Owner"), Some("bruno"));
}

#[tokio::test]
async fn test_iterate_clients() {
    let (mut p4, log) = connect(|params| match params.command.as_str() {
        "clients" => vec![
            stat(json!({ "client": "alpha", "Owner": "bruno" })),
            stat(json!({ "client": "beta", "Owner": "bruno" })),
        ],
        "client" => vec![client_form(&params.args[1])],
        _ => vec![],
    })
    .await;

    let mut names = Vec::new();
    let mut clients = p4.iterate_clients(&["-u", "bruno"]).await.unwrap();
    assert_eq!(clients.remaining(), 2);
    while let Some(client) = clients.next().await {
        names.push(client.unwrap().name().unwrap().to_string());
    }
    assert!(clients.next().await.is_none());
    assert_eq!(names, ["alpha", "beta"]);

    let sent = log.commands();
    assert_eq!(sent[0].command, "clients");
    assert_eq!(sent[0].args, ["-u", "bruno"]);
    assert_eq!(sent.len(), 3);
}

#[tokio::test]
async fn test_delete_and_submit() {
    let (mut p4, log) = connect(|params| match params.command.as_str() {
        "submit" => vec![
            Step::Request("command.input", json!({})),
            stat(json!({ "submittedChange": "42" })),
        ],
        _ => vec![info("Label v1.0 deleted.")],
    })
    .await;

    p4.delete_label("v1.0").await.unwrap();

    let mut change = Spec::new(SpecKind::Change);
    change.set("Change", "new").unwrap();
    change.set_description("Fix the build\n").unwrap();
    change.set("Files", vec!["//depot/main/a.c"]).unwrap();
    let result = p4.run_submit(Some(&change), &[]).await.unwrap();
    assert_eq!(
        result.records().next().unwrap().get_int("submittedChange"),
        Some(42)
    );

    let sent = log.commands();
    assert_eq!(sent[0].args, ["-d", "v1.0"]);
    assert_eq!(sent[1].args, ["-i"]);
    let form = log.replies()[0]["result"]["data"].as_str().unwrap().to_string();
    assert!(form.contains("Description:\n\tFix the build\n"));
}

#[tokio::test]
async fn test_save_shelve_sends_change_form() {
    let (mut p4, log) = connect(|_| {
        vec![
            Step::Request("command.input", json!({})),
            info("Change 77 files shelved."),
        ]
    })
    .await;

    let mut change = Spec::new(SpecKind::Change);
    change.set("Change", "77").unwrap();
    change.set_description("Work in progress\n").unwrap();
    change.set("Files", vec!["//depot/main/b.c"]).unwrap();
    let result = p4.save_shelve(&change).await.unwrap();
    assert_eq!(result.info().collect::<Vec<_>>(), ["Change 77 files shelved."]);

    let sent = log.commands();
    assert_eq!(sent[0].command, "shelve");
    assert_eq!(sent[0].args, ["-i"]);
    let form = log.replies()[0]["result"]["data"].as_str().unwrap().to_string();
    assert_eq!(form, change.format());
    assert!(form.contains("Files:\n\t//depot/main/b.c\n"));
}

#[tokio::test]
async fn test_queued_input_is_used_then_discarded() {
    let (mut p4, log) = connect(|params| match params.command.as_str() {
        "triggers" => vec![
            Step::Request("command.input", json!({})),
            Step::Request("command.prompt", json!({ "prompt": "Confirm: ", "noEcho": false })),
        ],
        _ => vec![Step::Request("command.input", json!({}))],
    })
    .await;

    p4.set_input(["Triggers:\n", "yes", "unused"]);
    p4.run("triggers", &["-i"]).await.unwrap();
    p4.run("typemap", &["-i"]).await.unwrap();

    let replies = log.replies();
    assert_eq!(replies[0]["result"]["data"], "Triggers:\n");
    assert_eq!(replies[1]["result"]["response"], "yes");
    // Leftover answers do not leak into the next command
    assert_eq!(replies[2]["result"]["data"], "");
}

// ============================================================================
// Filelog and tickets
// ============================================================================

#[tokio::test]
async fn test_run_filelog() {
    let (mut p4, _log) = connect(|_| {
        vec![stat(json!({
            "depotFile": "//depot/main/a.c",
            "rev0": "2", "change0": "12", "action0": "integrate", "type0": "text",
            "time0": "1700000000", "user0": "bruno", "client0": "bruno_ws", "desc0": "merge",
            "how0,0": "merge from", "file0,0": "//depot/dev/a.c", "srev0,0": "#1", "erev0,0": "#3",
            "rev1": "1", "change1": "10", "action1": "add", "type1": "text",
            "time1": "1690000000", "user1": "bruno", "client1": "bruno_ws", "desc1": "initial"
        }))]
    })
    .await;

    let files = p4.run_filelog(&["//depot/main/a.c"]).await.unwrap();
    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.depot_file, "//depot/main/a.c");
    assert_eq!(file.revisions.len(), 2);
    assert_eq!(file.revisions[0].integrations[0].how, "merge from");
    assert_eq!(file.revisions[1].action, "add");
}

#[test]
fn test_run_tickets_reads_ticket_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".p4tickets");
    std::fs::write(
        &path,
        "localhost:1666=bruno:ABCDEF0123456789\n10.0.0.5:1666=alice:0011223344\n",
    )
    .unwrap();

    let mut p4 = P4Client::default();
    p4.set_ticket_file(&path);
    let tickets = p4.run_tickets().unwrap();

    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].get_str("Host"), Some("localhost:1666"));
    assert_eq!(tickets[0].get_str("User"), Some("bruno"));
    assert_eq!(tickets[1].get_str("Ticket"), Some("0011223344"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_independent_sessions_run_in_parallel() {
    let mut tasks = Vec::new();
    for user in ["bruno", "alice"] {
        tasks.push(tokio::spawn(async move {
            let (mut p4, log): (P4Client, Log) = connect(|params| {
                vec![stat(json!({ "user": params.user.clone().unwrap_or_default() }))]
            })
            .await;
            p4.set_user(user);
            for _ in 0..20 {
                let result = p4.run("users", &[]).await.unwrap();
                let record = result.records().next().unwrap();
                assert_eq!(record.get_str("user"), Some(user));
            }
            p4.disconnect().await;
            log.commands().len()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 20);
    }
}

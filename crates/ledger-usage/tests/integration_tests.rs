//! Integration tests for ledger-usage against a mock home directory.

use chrono::NaiveDate;
use ledger_usage::parser::session_log::load_all_sessions;
use ledger_usage::provider::ClaudeProvider;
use ledger_usage::{
    SourceKind, SourcePaths, TokenUsage, UsageProvider, compute_burn_rate, load_all, merge,
    providers,
};
use rusqlite::{Connection, params};
use std::path::Path;
use tempfile::tempdir;

/// Stats cache with one opus-4-6 model entry.
const STATS_CACHE: &str = r#"{
    "version": 2,
    "lastComputedDate": "2026-02-10",
    "dailyActivity": [
        {"date": "2026-02-09", "messageCount": 120, "sessionCount": 3, "toolCallCount": 40},
        {"date": "2026-02-10", "messageCount": 80, "sessionCount": 2, "toolCallCount": 25}
    ],
    "dailyModelTokens": [
        {"date": "2026-02-09", "tokensByModel": {"claude-opus-4-6": 400000}},
        {"date": "2026-02-10", "tokensByModel": {"claude-opus-4-6": 600000}}
    ],
    "modelUsage": {
        "claude-opus-4-6": {
            "inputTokens": 112444,
            "outputTokens": 958448,
            "cacheReadInputTokens": 623295535,
            "cacheCreationInputTokens": 44469146
        }
    },
    "totalSessions": 5,
    "totalMessages": 200,
    "firstSessionDate": "2026-02-09T08:00:00.000Z"
}"#;

const SESSION_LOG: &str = r#"{"type":"user","sessionId":"SESSION_ID","timestamp":"2026-02-10T10:00:00.000Z","message":{"role":"user","content":"hello"}}
{"type":"assistant","sessionId":"SESSION_ID","timestamp":"2026-02-10T10:00:05.000Z","message":{"model":"claude-opus-4-6","usage":{"input_tokens":100,"output_tokens":50}}}
not json at all
"#;

const ROLLOUT: &str = r#"{"timestamp":"2026-02-10T09:00:00.000Z","type":"session_meta","payload":{"id":"codex-1","timestamp":"2026-02-10T09:00:00.000Z","cwd":"/home/dev/api"}}
{"timestamp":"2026-02-10T09:00:01.000Z","type":"turn_context","payload":{"model":"model-A"}}
{"timestamp":"2026-02-10T09:00:02.000Z","type":"event_msg","payload":{"type":"user_message"}}
{"timestamp":"2026-02-10T09:05:00.000Z","type":"turn_context","payload":{"model":"gpt-5-codex"}}
{"timestamp":"2026-02-10T09:05:09.000Z","type":"event_msg","payload":{"type":"token_count","info":{"total_token_usage":{"input_tokens":1000000,"output_tokens":100000}}}}
"#;

const GEMINI_SESSION: &str = r#"{
    "sessionId": "gem-1",
    "projectHash": "abc123",
    "startTime": "2026-02-09T12:00:00.000Z",
    "lastUpdated": "2026-02-09T12:10:00.000Z",
    "messages": [
        {"type": "user", "content": "hi"},
        {"type": "gemini", "content": "hello", "model": "gemini-2.5-flash",
         "tokens": {"input": 1000000, "output": 0, "cached": 0}}
    ]
}"#;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn create_cursor_db(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE ai_code_hashes (hash TEXT, source TEXT, fileExtension TEXT, createdAt INTEGER);
         CREATE TABLE conversation_summaries (conversationId TEXT, title TEXT, model TEXT, mode TEXT, updatedAt INTEGER);",
    )
    .unwrap();
    // 2026-02-10T12:00:00Z
    let created = 1_770_724_800_000_i64;
    for (i, ext) in ["rs", "rs", "py"].iter().enumerate() {
        conn.execute(
            "INSERT INTO ai_code_hashes VALUES (?1, 'tab', ?2, ?3)",
            params![format!("h{i}"), ext, created + i as i64],
        )
        .unwrap();
    }
    conn.execute(
        "INSERT INTO conversation_summaries VALUES ('conv-1', 'Refactor', NULL, 'agent', ?1)",
        params![created],
    )
    .unwrap();
}

/// Populate a fake home directory with data for every source.
fn create_home(home: &Path) {
    write(&home.join(".claude/stats-cache.json"), STATS_CACHE);
    write(
        &home.join(".claude/projects/-home-dev-webapp/s1.jsonl"),
        &SESSION_LOG.replace("SESSION_ID", "claude-1"),
    );
    write(
        &home.join(".codex/sessions/2026/02/10/rollout-2026-02-10T09-00-00-codex-1.jsonl"),
        ROLLOUT,
    );
    create_cursor_db(&home.join(".cursor/ai-tracking/ai-code-tracking.db"));
    write(
        &home.join(".gemini/tmp/abc123/chats/session-2026-02-09T12-00-gem1.json"),
        GEMINI_SESSION,
    );
}

fn cache_scenario_cost() -> f64 {
    112_444.0 * 5.0 / 1e6 + 958_448.0 * 25.0 / 1e6 + 623_295_535.0 * 0.50 / 1e6
        + 44_469_146.0 * 6.25 / 1e6
}

#[tokio::test]
async fn test_load_all_sources() {
    let home = tempdir().unwrap();
    create_home(home.path());

    let paths = SourcePaths::from_home(home.path());
    let providers = providers(&paths);
    assert!(providers.iter().all(|p| p.available()));

    let data = load_all(&providers).await;
    assert!(data.failures.is_empty());
    assert_eq!(data.providers.len(), 4);

    let kinds: Vec<SourceKind> = data.providers.iter().map(|p| p.source).collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::ClaudeCode,
            SourceKind::Codex,
            SourceKind::Cursor,
            SourceKind::Gemini
        ]
    );

    let claude = &data.providers[0];
    assert!((claude.total_cost.unwrap() - cache_scenario_cost()).abs() < 1e-6);
    assert_eq!(claude.sessions.len(), 1);
    assert_eq!(claude.sessions[0].project, "webapp");
    assert_eq!(claude.sessions[0].tokens, 150);

    // Cost priced entirely under the last model named
    let codex = &data.providers[1];
    assert_eq!(codex.sessions[0].model.as_deref(), Some("gpt-5-codex"));
    assert!((codex.total_cost.unwrap() - 2.25).abs() < 1e-9);
    assert_eq!(codex.daily_usage[0].date, "2026-02-10");

    let cursor = &data.providers[2];
    assert_eq!(cursor.total_cost, None);
    assert_eq!(cursor.generations, 3);
    assert_eq!(cursor.models[0].model, "rs");

    let gemini = &data.providers[3];
    assert!((gemini.total_cost.unwrap() - 0.30).abs() < 1e-9);

    // Grand totals
    let expected_total = cache_scenario_cost() + 2.25 + 0.30;
    assert!((data.total_cost.unwrap() - expected_total).abs() < 1e-6);
    assert_eq!(data.total_sessions, 4);
    assert_eq!(data.daily_usage.len(), 2);

    let feb10 = data
        .daily_usage
        .iter()
        .find(|d| d.date == "2026-02-10")
        .unwrap();
    assert_eq!(feb10.generations, 3);
    assert_eq!(feb10.sessions, 2 + 1); // cache summary + codex rollout
    assert_eq!(
        data.first_seen.unwrap().to_rfc3339(),
        "2026-02-09T08:00:00+00:00"
    );
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() {
    let home = tempdir().unwrap();
    create_home(home.path());
    // Corrupt the stats cache
    std::fs::write(home.path().join(".claude/stats-cache.json"), "{ truncated").unwrap();

    let data = load_all(&providers(&SourcePaths::from_home(home.path()))).await;
    assert_eq!(data.providers.len(), 3);
    assert_eq!(data.failures.len(), 1);
    assert_eq!(data.failures[0].source, SourceKind::ClaudeCode);
}

#[tokio::test]
async fn test_path_overrides_are_respected() {
    let home = tempdir().unwrap();
    let archive = tempdir().unwrap();
    write(
        &archive.path().join("2026/02/10/rollout-a.jsonl"),
        ROLLOUT,
    );

    let paths = SourcePaths::from_home(home.path()).with_codex_sessions_dir(archive.path());
    let data = load_all(&providers(&paths)).await;
    assert_eq!(data.providers.len(), 1);
    assert_eq!(data.providers[0].source, SourceKind::Codex);
}

#[tokio::test]
async fn test_merge_commutes_across_real_sources() {
    let home = tempdir().unwrap();
    create_home(home.path());
    let data = load_all(&providers(&SourcePaths::from_home(home.path()))).await;

    let mut reversed = data.providers.clone();
    reversed.reverse();
    let remerged = merge(reversed);
    assert_eq!(remerged.providers, data.providers);
    assert_eq!(remerged.daily_usage, data.daily_usage);
    assert_eq!(
        remerged.total_cost.map(f64::to_bits),
        data.total_cost.map(f64::to_bits)
    );
}

#[tokio::test]
async fn test_many_session_logs_load_concurrently() {
    let dir = tempdir().unwrap();
    let projects = dir.path().join("projects");
    for project in 0..5 {
        for session in 0..12 {
            let id = format!("p{project}-s{session}");
            write(
                &projects
                    .join(format!("-home-dev-proj{project}"))
                    .join(format!("{id}.jsonl")),
                &SESSION_LOG.replace("SESSION_ID", &id),
            );
        }
    }
    // A file without a session id is dropped
    write(
        &projects.join("-home-dev-proj0/empty.jsonl"),
        r#"{"type":"summary"}"#,
    );

    let sessions = load_all_sessions(&projects).await.unwrap();
    assert_eq!(sessions.len(), 60);
    assert!(sessions.iter().all(|s| s.token_usage == TokenUsage::new(100, 50)));
    assert!(sessions.iter().all(|s| s.project.starts_with("proj")));

    let mut ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    ids.dedup();
    assert_eq!(ids.len(), 60);
}

#[tokio::test]
async fn test_claude_summaries_and_burn_rate() {
    let home = tempdir().unwrap();
    create_home(home.path());
    let paths = SourcePaths::from_home(home.path());
    let claude = ClaudeProvider::new(&paths.claude_stats_cache, &paths.claude_projects_dir);
    let today = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();

    let summaries = claude.summaries(today).await.unwrap();
    assert_eq!(summaries.today.messages, 80);
    assert_eq!(summaries.this_week.day_count, 2);
    assert!((summaries.all_time.cost - cache_scenario_cost()).abs() < 1e-9);
    // Day estimates use the output rate: 600k tokens at $25/M
    assert!((summaries.today.cost - 15.0).abs() < 1e-9);

    let data = claude.load().await.unwrap();
    let burn = compute_burn_rate(&data.daily_usage, today);
    // (10 + 15) / 2 active days
    assert!((burn.daily_average - 12.5).abs() < 1e-9);
    assert!((burn.projected_monthly - 375.0).abs() < 1e-9);
    assert_eq!(burn.trend_vs_prior_week_percent, 0.0);
}

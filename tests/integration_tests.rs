//! Integration tests for glog
//!
//! These tests verify:
//! - Level filtering and the text line layout end to end
//! - Caller attribution for code outside the library
//! - Panic and fatal behavior
//! - Logging through a rotating file sink
//! - Process-wide logger installation

use glog::prelude::*;
use glog::{info, BufferPool};
use std::fs;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn memory_logger(level: Level) -> (Logger, MemorySink) {
    let sink = MemorySink::new();
    let logger = Logger::builder().level(level).output(sink.clone()).build();
    (logger, sink)
}

#[test]
fn test_disabled_level_writes_nothing_and_enabled_level_renders_line() {
    let (logger, sink) = memory_logger(Level::Info);

    logger.debug("x");
    assert!(sink.contents().is_empty());

    logger.with_field("user", "a").info("hello");
    let out = sink.contents_string();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[INFO]"));
    assert!(lines[0].contains("user= a"));
    assert!(lines[0].contains("_msg= hello"));
    assert!(out.ends_with('\n'));
}

#[test]
fn test_disabled_level_takes_no_buffer() {
    let pool = Arc::new(BufferPool::buffers());
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .level(Level::Warn)
        .output(sink.clone())
        .buffer_pool(Arc::clone(&pool))
        .build();

    for i in 0..100 {
        logger.with_field("i", i).debug("hidden");
        logger.info("hidden");
    }
    assert_eq!(pool.created(), 0);
    assert!(sink.contents().is_empty());

    logger.error("shown");
    assert_eq!(pool.created(), 1);
    assert_eq!(pool.idle(), 1);
}

#[test]
fn test_line_starts_with_local_timestamp() {
    let (logger, sink) = memory_logger(Level::Info);
    logger.info("stamped");

    let out = sink.contents_string();
    let stamp = &out[..19];
    assert!(
        chrono::NaiveDateTime::parse_from_str(stamp, glog::DEFAULT_TIMESTAMP_FORMAT).is_ok(),
        "unexpected prefix: {}",
        out
    );
    assert_eq!(&out[19..27], " [INFO] ");
}

#[test]
fn test_caller_reported_for_method_call() {
    let (logger, sink) = memory_logger(Level::Info);
    logger.set_report_caller(true);

    let line = line!() + 1;
    logger.with_field("k", 1).info("where");

    let out = sink.contents_string();
    let expected = format!("[INFO] file= {}:{} k= 1 _msg= where", file!(), line);
    assert!(out.contains(&expected), "{}", out);
    assert!(!out.contains("func="));
}

#[test]
fn test_caller_reported_with_function_for_macro() {
    let (logger, sink) = memory_logger(Level::Info);
    logger.set_report_caller(true);

    let line = line!() + 1;
    info!(logger, "from macro {}", 1);

    let out = sink.contents_string();
    assert!(
        out.contains("func= integration_tests::test_caller_reported_with_function_for_macro"),
        "{}",
        out
    );
    assert!(out.contains(&format!("file= {}:{}", file!(), line)), "{}", out);
}

#[test]
fn test_caller_omitted_when_disabled() {
    let (logger, sink) = memory_logger(Level::Info);
    info!(logger, "plain");
    let out = sink.contents_string();
    assert!(!out.contains("func="));
    assert!(!out.contains("file="));
}

#[test]
fn test_panic_level_writes_then_unwinds_with_entry() {
    let (logger, sink) = memory_logger(Level::Info);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        logger.with_field("req", 7).panicf(format_args!("bad state {}", 3));
    }));

    let entry = result
        .expect_err("panic level unwinds")
        .downcast::<Entry>()
        .expect("payload is the entry");
    assert_eq!(entry.message(), "bad state 3");
    assert_eq!(entry.level(), Level::Panic);
    assert!(sink.contents_string().contains("[PANIC] req= 7 _msg= bad state 3"));

    // the logger stays usable afterwards
    logger.info("after");
    assert!(sink.contents_string().contains("_msg= after"));
}

#[test]
fn test_fatal_invokes_injected_exit() {
    let (logger, sink) = memory_logger(Level::Info);
    let code = Arc::new(AtomicI32::new(0));
    let seen = Arc::clone(&code);
    logger.set_exit_fn(move |c| seen.store(c, Ordering::SeqCst));

    logger.with_field("svc", "db").fatal("unreachable");
    assert_eq!(code.load(Ordering::SeqCst), glog::EXIT_CODE);
    assert!(sink.contents_string().contains("[FATAL] svc= db _msg= unreachable"));
}

#[test]
fn test_json_field_values() {
    #[derive(serde::Serialize)]
    struct Req {
        id: u32,
        path: &'static str,
    }

    let (logger, sink) = memory_logger(Level::Info);
    let value = FieldValue::json(&Req { id: 1, path: "/x" }).unwrap();
    logger.with_field("req", value).info("done");
    assert!(sink
        .contents_string()
        .contains(r#"req= {"id":1,"path":"/x"} _msg= done"#));
}

#[test]
fn test_custom_formatter_receives_entry() {
    let (logger, sink) = memory_logger(Level::Info);
    logger.set_formatter(|entry: &Entry, buf: &mut Vec<u8>| -> glog::Result<()> {
        let fields: serde_json::Map<String, serde_json::Value> = entry
            .fields()
            .iter()
            .map(|f| (f.key.clone(), f.value.to_json_value()))
            .collect();
        let doc = serde_json::json!({
            "level": entry.level(),
            "msg": entry.message(),
            "fields": fields,
        });
        serde_json::to_writer(&mut *buf, &doc)?;
        buf.push(b'\n');
        Ok(())
    });

    logger.with_field("n", 2).warn("json");
    let line = sink.contents_string();
    let parsed: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(parsed["level"], "warn");
    assert_eq!(parsed["msg"], "json");
    assert_eq!(parsed["fields"]["n"], 2);
}

#[test]
fn test_logger_writes_through_rotating_sink() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("service.log");
    let sink = RotatingFileSink::new(RotatingFileConfig::new(&path).with_max_bytes(200));

    let logger = Logger::builder()
        .output(sink.clone())
        .formatter(TextFormatter::new().with_disable_color(true))
        .build();

    for i in 0..20 {
        logger.with_field("i", i).info("rotating");
    }
    logger.flush().unwrap();

    let mut files = 0;
    for entry in fs::read_dir(temp_dir.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        if !name.starts_with("service") {
            continue;
        }
        files += 1;
        let contents = fs::read_to_string(temp_dir.path().join(&name)).unwrap();
        assert!(contents.len() < 200, "{} holds {} bytes", name, contents.len());
        for line in contents.lines() {
            assert!(line.ends_with("_msg= rotating"), "partial line in {}: {}", name, line);
        }
    }
    assert!(files > 1);
    assert!(sink.current_size() < 200);
}

#[test]
fn test_oversized_entry_is_dropped_by_logger() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("small.log");
    let sink = RotatingFileSink::new(RotatingFileConfig::new(&path).with_max_bytes(64));
    let logger = Logger::builder().output(sink.clone()).build();

    logger.info("ok");
    let before = fs::metadata(&path).unwrap().len();
    logger.info("y".repeat(200));
    assert_eq!(fs::metadata(&path).unwrap().len(), before);
    assert_eq!(sink.current_size(), before);
}

#[test]
fn test_rotating_config_from_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("cfg.log");
    let doc = serde_json::json!({
        "path": path,
        "max_size": 1,
        "max_backups": 2,
        "compress": true,
    });
    let config: RotatingFileConfig = serde_json::from_value(doc).unwrap();
    let sink = RotatingFileSink::new(config);

    assert_eq!(sink.path(), path.as_path());
    assert_eq!(sink.max_bytes(), 1024 * 1024);
    assert_eq!(sink.config().max_backups, 2);
    assert!(sink.config().compress);
    assert_eq!(sink.config().max_age, 0);
}

#[test]
fn test_global_logger_is_installed_once() {
    let sink = MemorySink::new();
    let installed = init(Logger::builder().output(sink.clone()).level(Level::Debug));
    let again = init(Logger::builder().level(Level::Error));

    assert!(std::ptr::eq(installed, again));
    assert!(std::ptr::eq(installed, global()));
    assert_eq!(global().get_level(), Level::Debug);

    global().debug("through global");
    assert!(sink.contents_string().contains("_msg= through global"));
}

//! Basic connection, query and document find.
//!
//! # Running
//!
//! ```bash
//! export MYSQLX_HOST=localhost
//! export MYSQLX_SCHEMA=test
//! export MYSQLX_USER=root
//! export MYSQLX_PASSWORD=secret
//!
//! cargo run --example basic
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mysqlx_client::{CollectionFind, Config, Continuation, Error, ExecuteHooks, Field, ReadStatus, Session};
use mysqlx_protocol::StmtExecute;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("MYSQLX_HOST").unwrap_or_else(|_| "localhost".into());
    let schema = std::env::var("MYSQLX_SCHEMA").unwrap_or_else(|_| "test".into());
    let user = std::env::var("MYSQLX_USER").unwrap_or_else(|_| "root".into());
    let password = std::env::var("MYSQLX_PASSWORD").unwrap_or_default();

    let config = Config::from_connection_string(&format!(
        "host={host};schema={schema};user={user};password={password};prefetch=100"
    ))?;

    let mut session = Session::connect(config)?;
    let caps = session.capabilities()?;
    if let Some(mechanisms) = caps.get("authentication.mechanisms").and_then(|v| v.as_str_list()) {
        println!("Server offers: {}", mechanisms.join(", "));
    }
    let mut session = session.authenticate()?;

    // Buffered
    let result = session.execute_sql("SELECT VERSION(), ?", &[&"hello"])?;
    if let Some(set) = result.first() {
        let version: String = set.get(0, 0)?;
        println!("Server version: {version}");
    }

    // Streaming, at most 100 rows per read
    let statement = StmtExecute::sql("SELECT table_name FROM information_schema.tables");
    let mut on_field = |field: Field<'_>| {
        if let Ok(value) = field.decode() {
            println!("  {value:?}");
        }
        Continuation::Again
    };
    let mut status = session.execute_streaming(
        &statement,
        ExecuteHooks {
            on_field: Some(&mut on_field),
            ..ExecuteHooks::default()
        },
    )?;
    while status == ReadStatus::PrefetchReached {
        let mut on_more = |field: Field<'_>| {
            if let Ok(value) = field.decode() {
                println!("  {value:?}");
            }
            Continuation::Again
        };
        status = session.fetch_more(ExecuteHooks {
            on_field: Some(&mut on_more),
            ..ExecuteHooks::default()
        })?;
    }

    // Document query
    let mut find = CollectionFind::new(&schema, "orders");
    find.criteria("status = :status")?
        .bind([("status", "paid")])?
        .sort(["total DESC"])?
        .limit(5)?;
    match session.find(&find) {
        Ok(docs) => println!("{} paid orders", docs.into_first().len()),
        Err(e) if e.is_server_error(1146) => println!("no orders collection in {schema}"),
        Err(e) => return Err(e),
    }

    session.close()
}

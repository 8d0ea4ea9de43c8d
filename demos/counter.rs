//! Counter Demo - directives, interpolation, events and a computed property
//!
//! Binds a small template, then drives it the way a user would: typing into
//! the input and clicking the buttons. Each step prints the rendered markup.
//!
//! Run with: RUST_LOG=spark_bind=debug cargo run --example counter

use serde_json::json;
use spark_bind::{Computed, Document, El, Instance, Options};

const TEMPLATE: &str = r#"<div id="app">
  <input v-model="label">
  <h1>{{ label }}: {{ count }}</h1>
  <p v-text="parity"></p>
  <button v-on:click="increment">+</button>
  <button v-on:click="reset">reset</button>
</div>"#;

fn main() -> spark_bind::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("=== spark-bind Counter Demo ===\n");

    let doc = Document::parse(TEMPLATE);
    let vm = Instance::new(
        Options::default()
            .el(El::selector(&doc, "#app"))
            .data(json!({ "label": "Clicks", "count": 0 }))
            .computed(
                "parity",
                Computed::new(|scope| {
                    let count = scope.get("count")?.as_i64().unwrap_or_default();
                    Ok(json!(if count % 2 == 0 { "even" } else { "odd" }))
                }),
            )
            .method("increment", |vm, _event| {
                let count = vm.get("count")?.as_i64().unwrap_or_default();
                vm.set("count", count + 1)
            })
            .method("reset", |vm, _event| vm.set("count", 0)),
    )?;

    let app = doc.query_selector("#app");
    let print = |step: &str| {
        if let Some(app) = &app {
            println!("{step}:\n{}\n", app.outer_html());
        }
    };
    print("Initial");

    let buttons = doc
        .query_selector("#app")
        .map(|app| app.children())
        .unwrap_or_default()
        .into_iter()
        .filter(|node| node.tag_name() == "button")
        .collect::<Vec<_>>();

    if let Some(increment) = buttons.first() {
        increment.dispatch("click")?;
        increment.dispatch("click")?;
        increment.dispatch("click")?;
    }
    print("After three clicks");

    if let Some(input) = doc.query_selector("input") {
        input.input("Taps")?;
    }
    print("After typing 'Taps'");

    if let Some(reset) = buttons.get(1) {
        reset.dispatch("click")?;
    }
    print("After reset");

    println!("Data: {}", vm.data());
    println!("Observers: {}", vm.observer_count());
    Ok(())
}

use crate::fixtures::CORPUS;
use jscloak_transform::plugin::{JavaScriptPlugin, TransformPlugin};
use jscloak_transform::{transform, TransformMode, TransformOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_invocations_match_sequential_ones() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let options = TransformOptions {
        seed: 77,
        control_flow_flattening: true,
        dead_code_injection: true,
        ..TransformOptions::default()
    };

    let handles: Vec<_> = CORPUS
        .iter()
        .map(|(name, src)| {
            let options = options.clone();
            tokio::spawn(async move {
                let out = JavaScriptPlugin
                    .transform_source(src.to_string(), options, TransformMode::Obfuscate)
                    .await;
                (*name, *src, out)
            })
        })
        .collect();

    for handle in handles {
        let (name, src, out) = handle.await.unwrap();
        let expected = transform(src, &options, TransformMode::Obfuscate).unwrap();
        assert_eq!(out.unwrap(), expected, "{name}");
    }
}

#[tokio::test]
async fn plugins_are_interchangeable_behind_the_trait() {
    let plugins: Vec<Box<dyn TransformPlugin>> = vec![Box::new(JavaScriptPlugin)];
    for plugin in plugins {
        let out = plugin
            .transform_source(
                CORPUS[0].1.to_string(),
                plugin.default_options(),
                TransformMode::Deobfuscate,
            )
            .await
            .unwrap();
        assert!(out.contains("function counter("), "{out}");
    }
}

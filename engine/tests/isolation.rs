use oplog_engine::{
    chain, CallContext, ContextStack, EngineConfig, FunctionRegistry, HandlerKind, LogDescriptor,
    Pipeline,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chains_never_share_values() {
    let mut tasks = Vec::new();
    for (i, value) in ["A", "B"].into_iter().cycle().take(20).enumerate() {
        tasks.push(tokio::spawn(chain::scope(ContextStack::new(), async move {
            chain::push_frame().unwrap();
            chain::set_frame_variable("k", value).unwrap();
            // interleave with the other chains
            tokio::time::sleep(Duration::from_millis((i % 3) as u64)).await;
            tokio::task::yield_now().await;
            let seen = chain::get_variable("k");
            chain::pop_frame();
            (value, seen)
        })));
    }

    for task in tasks {
        let (written, seen) = task.await.unwrap();
        assert_eq!(seen, Some(json!(written)));
    }
}

#[tokio::test]
async fn test_plain_spawn_does_not_inherit() {
    chain::scope(ContextStack::new(), async {
        chain::set_global_variable("traceId", "t-1").unwrap();
        let seen = tokio::spawn(async { chain::get_variable("traceId") })
            .await
            .unwrap();
        assert_eq!(seen, None);

        let inherited = chain::spawn_inherited(async { chain::get_variable("traceId") })
            .await
            .unwrap();
        assert_eq!(inherited, Some(json!("t-1")));
    })
    .await;
}

#[tokio::test]
async fn test_child_writes_do_not_leak_to_parent() {
    chain::scope(ContextStack::new(), async {
        chain::set_global_variable("g", "parent").unwrap();
        chain::spawn_inherited(async {
            chain::set_global_variable("g", "child").unwrap();
            chain::set_frame_variable("only_child", 1).unwrap();
        })
        .await
        .unwrap();

        assert_eq!(chain::get_variable("g"), Some(json!("parent")));
        assert_eq!(chain::get_variable("only_child"), None);
    })
    .await;
}

#[tokio::test]
async fn test_nested_intercepts_use_their_own_frames() {
    let config = EngineConfig {
        handlers: vec![HandlerKind::Memory],
        ..EngineConfig::default()
    };
    let pipeline = Pipeline::start(&config, FunctionRegistry::new()).unwrap();
    let interceptor = pipeline.interceptor.clone();

    let outer = [LogDescriptor::new("OUTER", "outer saw {{#step}} / {{#traceId}}")];
    let inner = [LogDescriptor::new("INNER", "inner saw {{#step}} / {{#traceId}}")];

    chain::scope(ContextStack::new(), async {
        chain::set_global_variable("traceId", "t-7").unwrap();
        let out = interceptor
            .intercept(&outer, CallContext::new("Outer", "run"), None, || async {
                chain::set_frame_variable("step", "outer").unwrap();
                let nested = interceptor
                    .intercept(&inner, CallContext::new("Inner", "run"), None, || async {
                        chain::set_frame_variable("step", "inner").unwrap();
                        Ok::<_, String>(())
                    })
                    .await;
                assert_eq!(nested.audit.unwrap(), 1);
                // the inner frame was popped; ours is intact
                assert_eq!(chain::get_frame_variable("step"), Some(json!("outer")));
                Ok::<_, String>(())
            })
            .await;
        assert_eq!(out.audit.unwrap(), 1);
    })
    .await;

    drop(interceptor);
    let memory = pipeline.shutdown().await.unwrap();
    let contents: Vec<_> = memory
        .query(None, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(
        contents,
        ["inner saw inner / t-7", "outer saw outer / t-7"]
    );
}

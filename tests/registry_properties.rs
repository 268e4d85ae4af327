//! Property tests over random operation sequences.

use proptest::prelude::*;
use qirust_registry::renderer::{self, FnRenderer};
use qirust_registry::{
    ArtifactConfig, ArtifactRegistry, Canvas, ConfigOverrides, Handle, MountTarget, RegistryError,
    RenderError, Surface, Visual,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    FailingCreate,
    Update(usize, String),
    FailingUpdate(usize),
    Remove(usize),
    RemoveUnknown,
    Clear,
}

fn arb_content() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_content().prop_map(Op::Create),
        1 => Just(Op::FailingCreate),
        2 => (any::<usize>(), arb_content()).prop_map(|(i, c)| Op::Update(i, c)),
        1 => any::<usize>().prop_map(Op::FailingUpdate),
        2 => any::<usize>().prop_map(Op::Remove),
        1 => Just(Op::RemoveUnknown),
        1 => Just(Op::Clear),
    ]
}

fn echo() -> FnRenderer<
    impl Fn(&mut MountTarget<'_, Visual>, &str, &ArtifactConfig) -> Result<(), RenderError>,
> {
    renderer::from_fn::<Visual, _>(|target, content, _config| {
        target.attach(Visual::Text(content.to_string()))?;
        if content.starts_with('!') {
            return Err(RenderError::backend("echo", "refused"));
        }
        Ok(())
    })
}

fn surface_texts(canvas: &Canvas) -> Vec<String> {
    canvas
        .mounts()
        .into_iter()
        .map(|m| match canvas.nodes(m) {
            Some([Visual::Text(t)]) => t.clone(),
            other => panic!("mount {} holds {:?}", m, other),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(arb_op(), 0..40)) {
        let canvas: Canvas = Canvas::new();
        let mut registry = ArtifactRegistry::new(canvas, echo());
        let mut model: Vec<(Handle, String)> = Vec::new();
        let mut minted: HashSet<Handle> = HashSet::new();

        for op in ops {
            match op {
                Op::Create(content) => {
                    let handle = registry.create(&content, &ConfigOverrides::new()).unwrap();
                    prop_assert!(minted.insert(handle.clone()), "handle {} reused", handle);
                    model.push((handle, content));
                }
                Op::FailingCreate => {
                    let result = registry.create("!fail", &ConfigOverrides::new());
                    prop_assert!(matches!(result, Err(RegistryError::Render(_))));
                }
                Op::Update(i, content) if !model.is_empty() => {
                    let i = i % model.len();
                    prop_assert!(registry.update(&model[i].0, &content).unwrap());
                    model[i].1 = content;
                }
                Op::FailingUpdate(i) if !model.is_empty() => {
                    let i = i % model.len();
                    let before = registry.get(&model[i].0);
                    let result = registry.update(&model[i].0, "!fail");
                    prop_assert!(matches!(result, Err(RegistryError::Render(_))));
                    prop_assert_eq!(registry.get(&model[i].0), before);
                }
                Op::Remove(i) if !model.is_empty() => {
                    let i = i % model.len();
                    let (handle, _) = model.remove(i);
                    prop_assert!(registry.remove(&handle));
                    prop_assert!(!registry.remove(&handle));
                }
                Op::Update(_, _) | Op::FailingUpdate(_) | Op::Remove(_) => {
                    prop_assert!(!registry.update("artifact-0", "x").unwrap());
                }
                Op::RemoveUnknown => {
                    prop_assert!(!registry.remove("artifact-unknown"));
                }
                Op::Clear => {
                    let before = registry.count();
                    prop_assert_eq!(registry.clear(), before);
                    prop_assert!(registry.list().is_empty());
                    model.clear();
                }
            }

            let list = registry.list();
            prop_assert_eq!(registry.count(), list.len());
            prop_assert_eq!(registry.count(), model.len());
            let present = minted.iter().filter(|h| registry.get(h).is_some()).count();
            prop_assert_eq!(present, registry.count());

            let expected: Vec<(Handle, String)> =
                list.into_iter().map(|s| (s.handle, s.content)).collect();
            prop_assert_eq!(&expected, &model);

            let contents: Vec<String> = model.iter().map(|(_, c)| c.clone()).collect();
            prop_assert_eq!(surface_texts(registry.surface()), contents);
        }
    }
}

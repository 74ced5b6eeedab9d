//=========================================================================
// Stagecraft: Library Root
//
// This crate defines the public API surface of the scene engine.
//
// Responsibilities:
// - Expose the top-level facade (`Stage`) and its builder
// - Expose the core subsystems (scene, fade, transition, host) for
//   embeddings that need more than the facade
// - Keep completion plumbing between subsystems internal
//
// Typical usage:
// ```no_run
// use stagecraft::prelude::*;
//
// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
// enum GameScene { Boot, Title }
// impl SceneKey for GameScene {}
//
// struct BootScene;
// impl SceneController<GameScene> for BootScene {}
//
// struct TitleScene;
// impl SceneController<GameScene> for TitleScene {}
//
// fn main() {
//     let mut stage = StageBuilder::new()
//         .with_fixed_scenes([GameScene::Boot])
//         .build_with(MemoryHost::new);
//     stage.host_mut().install(GameScene::Boot, || Box::new(BootScene));
//     stage.host_mut().install(GameScene::Title, || Box::new(TitleScene));
//
//     stage.load_fixed_scenes(None);
//     stage.transition(GameScene::Title, false, None, None).ok();
//
//     loop {
//         stage.tick(1.0 / 60.0);
//         for event in stage.drain_events() {
//             println!("{event:?}");
//         }
//     }
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the scene subsystems (registry and manager, fade
// driver, transition machine, host bridge). It is exposed publicly for
// embeddings that drive the pieces directly, but application code will
// mostly use the top-level `Stage` facade.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `stage` defines the facade and builder; its types are re-exported
// below so users never need the module path.
//
mod stage;

//--- Public Exports ------------------------------------------------------
//
// Re-exports the `Stage` facade as the main entry point. This allows
// users to simply `use stagecraft::Stage;` without having to know the
// internal module structure.
//
pub use stage::{Stage, StageBuilder};

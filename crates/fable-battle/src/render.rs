//! Drawing contract between the battle core and whatever renders it.
//!
//! The core never talks to a GPU or a terminal. It issues primitive draw calls
//! against a [`RenderContext`]; [`DrawList`] records them for headless runs and
//! tests.

use fable_common::{Direction, Vec2};
use serde::{Deserialize, Serialize};

/// Sink for draw calls.
pub trait RenderContext {
    /// Draws a sprite at a screen position.
    fn sprite(&mut self, key: &str, at: Vec2, size: Vec2, facing: Direction, faded: bool);
    /// Draws a line of text.
    fn text(&mut self, text: &str, at: Vec2);
    /// Draws the target selection arrow.
    fn arrow(&mut self, at: Vec2);
}

/// Something that can draw itself.
pub trait Renderable {
    /// Draws at `offset` (in world units) scaled by `resolution` pixels per unit.
    fn draw(&self, ctx: &mut dyn RenderContext, offset: Vec2, resolution: f32);
}

/// A recorded draw call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    /// Sprite draw.
    Sprite {
        /// Sprite key.
        key: String,
        /// Screen position.
        at: Vec2,
        /// Screen size.
        size: Vec2,
        /// Facing.
        facing: Direction,
        /// Drawn faded (defeated).
        faded: bool,
    },
    /// Text draw.
    Text {
        /// Text content.
        text: String,
        /// Screen position.
        at: Vec2,
    },
    /// Selection arrow.
    Arrow {
        /// Screen position.
        at: Vec2,
    },
}

/// Render context that records every call.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Creates an empty draw list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands in call order.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Lines of text recorded so far.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Clears recorded commands.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderContext for DrawList {
    fn sprite(&mut self, key: &str, at: Vec2, size: Vec2, facing: Direction, faded: bool) {
        self.commands.push(DrawCommand::Sprite {
            key: key.to_owned(),
            at,
            size,
            facing,
            faded,
        });
    }

    fn text(&mut self, text: &str, at: Vec2) {
        self.commands.push(DrawCommand::Text {
            text: text.to_owned(),
            at,
        });
    }

    fn arrow(&mut self, at: Vec2) {
        self.commands.push(DrawCommand::Arrow { at });
    }
}

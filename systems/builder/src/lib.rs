#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure builder system that turns cursor gestures into construction commands.
//!
//! Towers are placed by dragging a kind onto a tile and releasing it. Wires
//! are drawn by pressing on an existing node and dragging across adjacent
//! empty tiles; dragging back over the previous node retracts the wire,
//! together with any tower standing on it.

use wire_defence_core::{Command, Event, TileCoord, TowerKind, WireSnapshot};

const DEFAULT_WIRE_PRICE: u32 = 1;

/// Declarative placement preview describing a potential tower construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Kind of tower proposed for placement.
    pub kind: TowerKind,
    /// Tile the tower would occupy.
    pub tile: TileCoord,
    /// Indicates whether the preview represents a valid placement location.
    pub placeable: bool,
}

impl PlacementPreview {
    /// Creates a new placement preview descriptor.
    #[must_use]
    pub const fn new(kind: TowerKind, tile: TileCoord, placeable: bool) -> Self {
        Self {
            kind,
            tile,
            placeable,
        }
    }
}

/// Builds the hover preview for dragging `kind` over `tile`.
///
/// `path_open` should carry the world's `can_place` answer for the tile and
/// `wire` the wire node standing on it. The world re-validates everything,
/// so the preview only needs to be right for the common cases.
#[must_use]
pub fn placement_preview(
    kind: TowerKind,
    tile: TileCoord,
    funds: u32,
    path_open: bool,
    wire: Option<WireSnapshot>,
) -> PlacementPreview {
    let mount = match wire {
        Some(wire) => wire.tower.is_none() && (!kind.is_core() || wire.parent.is_none()),
        None => kind.is_core(),
    };
    PlacementPreview::new(kind, tile, mount && path_open && funds >= kind.price())
}

/// Cursor feedback shown while the builder interprets gestures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CursorFeedback {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A wire is being drawn.
    Drawing,
    /// The last gesture step was not possible.
    Blocked,
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Tile currently hovered by the cursor.
    pub cursor_tile: Option<TileCoord>,
    /// The primary button went down on this frame.
    pub pressed: bool,
    /// The primary button is being held.
    pub held: bool,
    /// The primary button went up on this frame.
    pub released: bool,
    /// Tower kind being dragged from the shop, if any.
    pub dragging_tower: Option<TowerKind>,
    /// Indicates whether the player requested tower removal on this frame.
    pub remove_action: bool,
    /// Indicates whether the player requested a tower upgrade on this frame.
    pub upgrade_action: bool,
    /// Money available to the player.
    pub funds: u32,
}

/// Builder system that translates previews and gestures into commands.
#[derive(Clone, Debug)]
pub struct Builder {
    wire_price: u32,
    wire_start: Option<TileCoord>,
    cursor: CursorFeedback,
    frozen: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(DEFAULT_WIRE_PRICE)
    }
}

impl Builder {
    /// Creates a new builder that charges `wire_price` per wire segment.
    #[must_use]
    pub const fn new(wire_price: u32) -> Self {
        Self {
            wire_price,
            wire_start: None,
            cursor: CursorFeedback::Idle,
            frozen: false,
        }
    }

    /// Cursor feedback derived from the most recent frame.
    #[must_use]
    pub const fn cursor(&self) -> CursorFeedback {
        self.cursor
    }

    /// Tile of the node the wire drag currently grows from.
    #[must_use]
    pub const fn wire_start(&self) -> Option<TileCoord> {
        self.wire_start
    }

    /// Consumes world events and adapter-derived input to emit builder commands.
    ///
    /// The `wire_at` closure should mirror the semantics of the world's
    /// `query::wire_at` helper so the system can inspect the hovered nodes.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        preview: Option<PlacementPreview>,
        input: BuilderInput,
        mut wire_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(TileCoord) -> Option<WireSnapshot>,
    {
        for event in events {
            match event {
                Event::GameOver => self.frozen = true,
                Event::WireRejected { .. } | Event::TowerPlacementRejected { .. } => {
                    self.cursor = CursorFeedback::Blocked;
                }
                _ => {}
            }
        }

        if self.frozen {
            self.wire_start = None;
            self.cursor = CursorFeedback::Idle;
            return;
        }

        if input.dragging_tower.is_some() {
            self.wire_start = None;
            if input.released {
                if let Some(preview) = preview.filter(|preview| preview.placeable) {
                    out.push(Command::PlaceTower {
                        kind: preview.kind,
                        tile: preview.tile,
                    });
                }
            }
        } else {
            self.draw_wire(input, &mut wire_at, out);
        }

        if let Some(tile) = input.cursor_tile {
            let tower = wire_at(tile).and_then(|wire| wire.tower);
            if let Some(kind) = tower {
                if input.remove_action {
                    out.push(Command::RemoveTower { tile });
                } else if input.upgrade_action && input.funds >= kind.price() {
                    out.push(Command::UpgradeTower { tile });
                }
            }
        }
    }

    fn draw_wire<F>(&mut self, input: BuilderInput, wire_at: &mut F, out: &mut Vec<Command>)
    where
        F: FnMut(TileCoord) -> Option<WireSnapshot>,
    {
        if input.released || !(input.pressed || input.held) {
            self.wire_start = None;
            self.cursor = CursorFeedback::Idle;
            return;
        }

        let Some(cursor) = input.cursor_tile else {
            return;
        };

        if input.pressed {
            if wire_at(cursor).is_some() {
                self.wire_start = Some(cursor);
                self.cursor = CursorFeedback::Drawing;
            } else {
                self.wire_start = None;
                self.cursor = CursorFeedback::Blocked;
            }
            return;
        }

        let Some(start) = self.wire_start else {
            return;
        };
        if cursor == start {
            return;
        }
        let Some(node) = wire_at(start) else {
            self.wire_start = None;
            self.cursor = CursorFeedback::Blocked;
            return;
        };

        let retracting = node.parent == Some(cursor) && node.child_count == 0 && !node.permanent;
        if retracting {
            out.push(Command::RemoveWire { tile: start });
            self.wire_start = Some(cursor);
            self.cursor = CursorFeedback::Drawing;
            return;
        }

        let extendable = start
            .direction_to(cursor)
            .is_some_and(|direction| node.incoming != Some(direction))
            && wire_at(cursor).is_none()
            && input.funds >= self.wire_price;
        if extendable {
            out.push(Command::ExtendWire {
                from: start,
                to: cursor,
            });
            self.wire_start = Some(cursor);
            self.cursor = CursorFeedback::Drawing;
        } else {
            self.cursor = CursorFeedback::Blocked;
        }
    }
}

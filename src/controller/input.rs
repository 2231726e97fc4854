/// Platform-agnostic input handling system

/// Platform-independent input events
#[derive(Debug, Clone)]
pub enum InputEvent {
    // Keyboard events
    KeyDown(String),
    KeyUp(String),

    // Mouse events
    MouseMove { dx: f32, dy: f32 },

    // Window events
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

/// The keys the game listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Left,
    Back,
    Right,
    Interact,
}

impl Key {
    #[cfg(test)]
    pub const ALL: [Key; 5] = [Key::Forward, Key::Left, Key::Back, Key::Right, Key::Interact];

    fn index(self) -> usize {
        self as usize
    }
}

/// Key mapping configuration
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub interact: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            interact: " ".to_string(),
        }
    }
}

impl KeyBindings {
    /// Map a platform key string (any case) to a game key
    pub fn resolve(&self, key: &str) -> Option<Key> {
        let key = key.to_lowercase();
        [
            (&self.forward, Key::Forward),
            (&self.left, Key::Left),
            (&self.backward, Key::Back),
            (&self.right, Key::Right),
            (&self.interact, Key::Interact),
        ]
        .into_iter()
        .find(|(binding, _)| binding.as_str() == key)
        .map(|(_, k)| k)
    }
}

/// Pressed state of the fixed key set plus pointer-lock look input
pub struct InputState {
    pressed: [bool; 5],
    pub look_delta: (f32, f32),
    pub pointer_locked: bool,
    bindings: KeyBindings,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::with_bindings(KeyBindings::default())
    }

    pub fn with_bindings(bindings: KeyBindings) -> Self {
        Self {
            pressed: [false; 5],
            look_delta: (0.0, 0.0),
            pointer_locked: false,
            bindings,
        }
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                if let Some(k) = self.bindings.resolve(key) {
                    self.set_pressed(k, true);
                }
            }
            InputEvent::KeyUp(key) => {
                if let Some(k) = self.bindings.resolve(key) {
                    self.set_pressed(k, false);
                }
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta.0 += dx;
                    self.look_delta.1 += dy;
                }
            }
            InputEvent::FocusLost => {
                self.clear_keys();
            }
            InputEvent::VisibilityChanged { visible: _ } => {
                self.clear_keys();
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = (0.0, 0.0);
                }
            }
        }
    }

    pub fn set_pressed(&mut self, key: Key, down: bool) {
        self.pressed[key.index()] = down;
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }

    pub fn is_moving(&self) -> bool {
        [Key::Forward, Key::Left, Key::Back, Key::Right].iter().any(|&k| self.is_pressed(k))
    }

    /// (forward, right) axis values in -1..=1
    pub fn move_axes(&self) -> (f32, f32) {
        let axis = |pos: Key, neg: Key| self.is_pressed(pos) as i32 as f32 - self.is_pressed(neg) as i32 as f32;
        (axis(Key::Forward, Key::Back), axis(Key::Right, Key::Left))
    }

    pub fn clear_keys(&mut self) {
        self.pressed = [false; 5];
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }

    /// Whether the browser should swallow this key's default action
    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.resolve(key).is_some()
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let key = e.key();
        if is_down {
            InputEvent::KeyDown(key)
        } else {
            InputEvent::KeyUp(key)
        }
    }

    pub fn mouse_move_to_input(e: &web_sys::MouseEvent) -> InputEvent {
        InputEvent::MouseMove { dx: e.movement_x() as f32, dy: e.movement_y() as f32 }
    }
}

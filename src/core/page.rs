//! # Page Model
//!
//! A `Page` is one screen's worth of buttons; a `Button` is a tappable
//! grid region with an image and an optional press handler. Insertion
//! order is significant: it determines the panel's 1-based button
//! numbering, so the page assigns each button its zero-based index at
//! append time.
//!
//! Pages hold no channel handle. Rendering and live image updates are
//! driven by the engine (`core::app`), which passes itself into press
//! handlers as an explicit context instead of a stored back-reference.

use std::rc::Rc;

use crate::core::app::App;
use crate::panel::channel::ChannelError;

/// A button press handler.
///
/// Receives the application context and the zero-based index of the
/// pressed button on the current page. Handlers run synchronously on the
/// event loop and must not block; navigation calls made here take effect
/// on the next loop iteration.
pub type ButtonAction = Rc<dyn Fn(&mut App, usize) -> Result<(), ChannelError>>;

/// Wraps a closure as a [`ButtonAction`].
pub fn action<F>(f: F) -> ButtonAction
where
    F: Fn(&mut App, usize) -> Result<(), ChannelError> + 'static,
{
    Rc::new(f)
}

/// The capability a screen type implements: fill a freshly created page
/// with its buttons. Invoked exactly once, by [`Page::from_screen`].
///
/// Per-screen state that handlers need (e.g. a stashed previous page)
/// lives in fields of the implementor and is shared into the closures.
pub trait Screen {
    fn populate(&self, page: &mut Page);
}

pub struct Button {
    pub x: u8,
    pub y: u8,
    pub w: u8,
    pub h: u8,
    image: String,
    index: usize,
    pub(crate) action: Option<ButtonAction>,
}

impl Button {
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Zero-based position on the owning page (wire numbering is this
    /// plus one).
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_image(&mut self, image: &str) {
        self.image = image.to_string();
    }
}

pub struct Page {
    /// Assigned by the engine when the page enters the stack; used to
    /// decide whether the panel still shows this page.
    pub(crate) id: u64,
    buttons: Vec<Button>,
}

impl Page {
    pub fn new() -> Self {
        Self {
            id: 0,
            buttons: Vec::new(),
        }
    }

    /// Builds a page and runs the screen's populate hook once.
    pub fn from_screen(screen: &dyn Screen) -> Self {
        let mut page = Page::new();
        screen.populate(&mut page);
        page
    }

    /// Appends a button and assigns it the next index.
    ///
    /// The panel firmware parses `addbutton` geometry as fixed
    /// single-width digits, so positions must be 0..=9 and sizes 1..=9.
    /// Violations are programmer errors and panic.
    pub fn add_button(&mut self, x: u8, y: u8, w: u8, h: u8, image: &str, action: Option<ButtonAction>) {
        assert!(x <= 9 && y <= 9, "button position must be single decimal digits");
        assert!(
            (1..=9).contains(&w) && (1..=9).contains(&h),
            "button size must be single decimal digits of at least 1"
        );
        let index = self.buttons.len();
        self.buttons.push(Button {
            x,
            y,
            w,
            h,
            image: image.to_string(),
            index,
            action,
        });
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn button(&self, i: usize) -> Option<&Button> {
        self.buttons.get(i)
    }

    pub(crate) fn button_mut(&mut self, i: usize) -> Option<&mut Button> {
        self.buttons.get_mut(i)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

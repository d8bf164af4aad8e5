use crate::machine::SharedMachine;
use crate::system::System;
use crate::video::Framebuffer;

/// Presentation side of the machine lock, called by the front end once per
/// displayed frame. Rendering only happens here, never on the scheduler.
pub struct Presenter<S> {
    machine: SharedMachine<S>,
}

impl<S: System> Presenter<S> {
    pub fn new(machine: SharedMachine<S>) -> Self {
        Presenter { machine }
    }

    /// Render the current scan buffer scaled to `viewport_width` pixels.
    ///
    /// Returns `None` when there is no viewport to draw into or the
    /// interpreter drew nothing.
    pub fn frame(&self, viewport_width: usize) -> Option<Framebuffer> {
        if viewport_width == 0 {
            return None;
        }
        let mut m = self.machine.lock();
        m.state.video_mut().set_viewport_width(viewport_width);
        m.refresh();
        m.state.video().surface().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::tests::CountingSystem;
    use crate::machine::MachineState;
    use crate::video::PalettePolicy;

    fn presenter() -> (SharedMachine<CountingSystem>, Presenter<CountingSystem>) {
        let m = SharedMachine::new(
            CountingSystem::default(),
            MachineState::new(vec![], PalettePolicy::Plan9),
        );
        (m.clone(), Presenter::new(m))
    }

    #[test]
    fn test_frame_is_scaled_to_viewport() {
        let (_, p) = presenter();
        let f = p.frame(128).unwrap();
        assert_eq!((f.width(), f.height()), (128, 64));
        // CountingSystem draws palette index 0 before any step
        assert_eq!(f.pixel(10, 10), [0, 0, 0, 0xff]);
    }

    #[test]
    fn test_zero_viewport_produces_nothing() {
        let (m, p) = presenter();
        assert!(p.frame(0).is_none());
        assert!(m.lock().state.video().framebuffer().is_none());
    }

    #[test]
    fn test_frame_follows_steps() {
        let (m, p) = presenter();
        let before = p.frame(64).unwrap();
        m.lock().step().unwrap();
        let after = p.frame(64).unwrap();
        assert_ne!(before, after);
        assert_eq!(after.pixel(0, 0), [0x00, 0x00, 0x44, 0xff]);
    }

    #[test]
    fn test_same_scan_same_frame() {
        let (_, p) = presenter();
        assert_eq!(p.frame(100), p.frame(100));
    }
}

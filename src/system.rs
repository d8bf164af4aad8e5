use rand::rngs::StdRng;
use std::error::Error;
use std::io;

/// The virtual CPU interpreter. The studio never looks inside it: it only
/// steps, resets and asks it to redraw, always while holding the machine lock.
pub trait System: Send {
    type Error: Error + Send + 'static;

    /// execute exactly one instruction
    fn step(&mut self, host: &mut dyn Host) -> Result<(), Self::Error>;

    /// return to the boot state, reloading the program through `Host::load`
    fn reset(&mut self, host: &mut dyn Host);

    /// mark the display as needing a redraw
    fn invalidate(&mut self);

    /// has the display changed since the last refresh
    fn invalid(&self) -> bool;

    /// redraw through `Host::draw` if the display is invalid
    fn refresh(&mut self, host: &mut dyn Host);

    /// human readable machine state for a debug view
    fn dump(&self, sink: &mut dyn io::Write, label: &str) -> io::Result<()>;
}

/// Environment the interpreter runs in: everything it needs from the outside
/// world. Implemented by `MachineState`.
pub trait Host {
    /// copy the current program image into interpreter memory
    fn load(&mut self, memory: &mut [u8]);

    /// is `code` (0x0-0xf) the key most recently reported
    fn key(&self, code: u8) -> bool;

    /// a freshly seeded random source
    fn rand(&mut self) -> StdRng;

    fn begin_tone(&mut self);

    fn end_tone(&mut self);

    /// logical display width changed (e.g. 64 -> 128 for hi-res modes)
    fn resize_video(&mut self, width: usize);

    /// present the scan buffer, one palette index per pixel
    fn draw(&mut self, video: &[u8]);
}

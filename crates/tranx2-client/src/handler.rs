use std::sync::mpsc;

use tranx2_codec::{DecodeError, Passing};

/// Callbacks invoked by [`Client::serve`](crate::Client::serve), one per line.
///
/// Any type providing all three can act as a handler. For ad-hoc closures use
/// [`Callbacks`]; to move events to another thread use an
/// `mpsc::Sender<Event>`.
pub trait Handler {
    fn on_passing(&mut self, rec: Passing);
    fn on_noise(&mut self, noise: u16);
    /// A line with a known marker failed to decode. The loop continues.
    fn on_error(&mut self, err: DecodeError);
}

impl<H: Handler + ?Sized> Handler for &mut H {
    fn on_passing(&mut self, rec: Passing) {
        (**self).on_passing(rec)
    }

    fn on_noise(&mut self, noise: u16) {
        (**self).on_noise(noise)
    }

    fn on_error(&mut self, err: DecodeError) {
        (**self).on_error(err)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn on_passing(&mut self, rec: Passing) {
        (**self).on_passing(rec)
    }

    fn on_noise(&mut self, noise: u16) {
        (**self).on_noise(noise)
    }

    fn on_error(&mut self, err: DecodeError) {
        (**self).on_error(err)
    }
}

/// Three independent closures bundled as a [`Handler`].
pub struct Callbacks<P, N, E> {
    pub on_passing: P,
    pub on_noise: N,
    pub on_error: E,
}

impl<P, N, E> Handler for Callbacks<P, N, E>
where
    P: FnMut(Passing),
    N: FnMut(u16),
    E: FnMut(DecodeError),
{
    fn on_passing(&mut self, rec: Passing) {
        (self.on_passing)(rec)
    }

    fn on_noise(&mut self, noise: u16) {
        (self.on_noise)(noise)
    }

    fn on_error(&mut self, err: DecodeError) {
        (self.on_error)(err)
    }
}

/// One dispatched callback, as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Passing(Passing),
    Noise(u16),
    Error(DecodeError),
}

/// Collects events in arrival order.
impl Handler for Vec<Event> {
    fn on_passing(&mut self, rec: Passing) {
        self.push(Event::Passing(rec));
    }

    fn on_noise(&mut self, noise: u16) {
        self.push(Event::Noise(noise));
    }

    fn on_error(&mut self, err: DecodeError) {
        self.push(Event::Error(err));
    }
}

/// Forwards events to a receiver; events sent after the receiver is gone are dropped.
impl Handler for mpsc::Sender<Event> {
    fn on_passing(&mut self, rec: Passing) {
        let _ = self.send(Event::Passing(rec));
    }

    fn on_noise(&mut self, noise: u16) {
        let _ = self.send(Event::Noise(noise));
    }

    fn on_error(&mut self, err: DecodeError) {
        let _ = self.send(Event::Error(err));
    }
}

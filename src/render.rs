//! # Render Handoff Module
//!
//! The seam between the signal producers and the chart widget that lives on
//! the UI thread. Producers talk to a `RenderSurface`; the concrete widget is
//! supplied by the host application.
//!
//! ## Blocking Handoff
//! `chart_link` pairs a `ChartSender` with a `ChartReceiver` over two
//! capacity-zero channels: one carrying chart commands, one carrying
//! acknowledgments back. A delivery does not return until the consumer has
//! received the command and acknowledged it, so the producer can never run
//! more than one delivery ahead of the renderer. That is the system's
//! backpressure policy: ingestion speed is throttled to rendering speed and
//! memory stays bounded.
//!
//! Deliveries are strictly ordered; delivery N+1 cannot start before the
//! acknowledgment for delivery N has been returned.

use crate::error::SignalError;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Chart operations a producer may request.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartCommand {
    SetAxisY { min: f64, max: f64 },
    ReplaceSeries { xs: Vec<f64>, ys: Vec<f64> },
}

/// Consumed by the streaming and paging producers. Both calls block until the
/// receiver has finished processing.
pub trait RenderSurface {
    fn set_axis_y(&mut self, min: f64, max: f64) -> Result<(), SignalError>;
    fn replace_series(&mut self, xs: &[f64], ys: &[f64]) -> Result<(), SignalError>;
}

/// Create a connected producer/consumer pair for chart deliveries.
pub fn chart_link() -> (ChartSender, ChartReceiver) {
    let (command_tx, command_rx) = bounded(0);
    let (ack_tx, ack_rx) = bounded(0);
    (
        ChartSender {
            commands: command_tx,
            acks: ack_rx,
        },
        ChartReceiver {
            commands: command_rx,
            acks: ack_tx,
        },
    )
}

/// Producer half of the chart link. Lives on the worker thread.
pub struct ChartSender {
    commands: Sender<ChartCommand>,
    acks: Receiver<()>,
}

impl ChartSender {
    fn deliver(&self, command: ChartCommand) -> Result<(), SignalError> {
        self.commands
            .send(command)
            .map_err(|_| SignalError::SurfaceClosed)?;
        self.acks.recv().map_err(|_| SignalError::SurfaceClosed)
    }
}

impl RenderSurface for ChartSender {
    fn set_axis_y(&mut self, min: f64, max: f64) -> Result<(), SignalError> {
        self.deliver(ChartCommand::SetAxisY { min, max })
    }

    fn replace_series(&mut self, xs: &[f64], ys: &[f64]) -> Result<(), SignalError> {
        self.deliver(ChartCommand::ReplaceSeries {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

/// Consumer half of the chart link. Lives on the UI thread; every received
/// command must be acknowledged once rendering is done, or the producer stays
/// blocked.
pub struct ChartReceiver {
    commands: Receiver<ChartCommand>,
    acks: Sender<()>,
}

impl ChartReceiver {
    /// Block for the next command. `None` means the producer is gone.
    pub fn recv(&self) -> Option<ChartCommand> {
        self.commands.recv().ok()
    }

    /// Non-blocking poll, for hosts that pump commands from an event loop.
    pub fn try_recv(&self) -> Option<ChartCommand> {
        self.commands.try_recv().ok()
    }

    /// Release the producer after processing a received command.
    pub fn ack(&self) {
        let _ = self.acks.send(());
    }

    /// Receive one command, apply it to `surface`, acknowledge it. Returns
    /// false once the producer side has disconnected.
    pub fn serve(&self, surface: &mut impl RenderSurface) -> Result<bool, SignalError> {
        let command = match self.recv() {
            Some(command) => command,
            None => return Ok(false),
        };
        let result = match command {
            ChartCommand::SetAxisY { min, max } => surface.set_axis_y(min, max),
            ChartCommand::ReplaceSeries { xs, ys } => surface.replace_series(&xs, &ys),
        };
        self.ack();
        result.map(|_| true)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory surface that records deliveries, optionally hanging up after
    /// a fixed number of series updates.
    pub(crate) struct RecordingSurface {
        pub axis: Vec<(f64, f64)>,
        pub series: Vec<(Vec<f64>, Vec<f64>)>,
        pub series_limit: Option<usize>,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self {
                axis: Vec::new(),
                series: Vec::new(),
                series_limit: None,
            }
        }

        pub fn with_limit(limit: usize) -> Self {
            Self {
                series_limit: Some(limit),
                ..Self::new()
            }
        }
    }

    impl RecordingSurface {
        fn closed(&self) -> bool {
            self.series_limit
                .map(|limit| self.series.len() >= limit)
                .unwrap_or(false)
        }
    }

    impl RenderSurface for RecordingSurface {
        fn set_axis_y(&mut self, min: f64, max: f64) -> Result<(), SignalError> {
            if self.closed() {
                return Err(SignalError::SurfaceClosed);
            }
            self.axis.push((min, max));
            Ok(())
        }

        fn replace_series(&mut self, xs: &[f64], ys: &[f64]) -> Result<(), SignalError> {
            if self.closed() {
                return Err(SignalError::SurfaceClosed);
            }
            self.series.push((xs.to_vec(), ys.to_vec()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSurface;
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_commands_arrive_in_order() {
        let (mut sender, receiver) = chart_link();

        let producer = thread::spawn(move || {
            sender.set_axis_y(-1.0, 1.0).unwrap();
            sender.replace_series(&[0.0, 1.0], &[5.0, 6.0]).unwrap();
        });

        let mut surface = RecordingSurface::new();
        while receiver.serve(&mut surface).unwrap() {}
        producer.join().unwrap();

        assert_eq!(surface.axis, vec![(-1.0, 1.0)]);
        assert_eq!(surface.series, vec![(vec![0.0, 1.0], vec![5.0, 6.0])]);
    }

    #[test]
    fn test_delivery_blocks_until_ack() {
        let (mut sender, receiver) = chart_link();
        let delivered = Arc::new(AtomicBool::new(false));
        let delivered_in_thread = delivered.clone();

        let producer = thread::spawn(move || {
            sender.set_axis_y(0.0, 1.0).unwrap();
            delivered_in_thread.store(true, Ordering::SeqCst);
        });

        // Receive the command but hold the acknowledgment back.
        let command = receiver.recv().unwrap();
        assert!(matches!(command, ChartCommand::SetAxisY { .. }));
        thread::sleep(Duration::from_millis(50));
        assert!(!delivered.load(Ordering::SeqCst));

        receiver.ack();
        producer.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_dropped_receiver_closes_surface() {
        let (mut sender, receiver) = chart_link();
        drop(receiver);

        let err = sender.replace_series(&[0.0], &[0.0]).unwrap_err();
        assert!(matches!(err, SignalError::SurfaceClosed));
    }
}

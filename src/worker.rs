use super::*;

use log::*;
use std::sync::mpsc::{channel, Receiver, RecvError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

/// What the compute thread should expose through shared memory instead of
/// copying into reply messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedConfig {
    pub outputs: bool,
    pub net_values: bool,
}

/// A request to the compute thread.
#[derive(Debug)]
pub enum Request {
    /// Install a packed netlist. Replaces any previous one.
    Init { packed: PackedNetlist, shared: SharedConfig },
    /// Stage input changes. No reply; problems surface as [`Response::Error`].
    SetInputs { pins: Vec<PinId>, values: Vec<bool> },
    /// Propagate and reply with outputs (or a shared-buffer version).
    Run { max_steps: Option<usize> },
    /// Clear all value state and shared-buffer version counters.
    Reset,
    /// Stop serving. [`Worker::shutdown`] sends this and joins.
    Shutdown,
}

/// A reply from the compute thread.
#[derive(Debug)]
pub enum Response {
    Ready {
        net_count: usize,
        comp_count: usize,
        input_count: usize,
        output_count: usize,
        shared_outputs: Option<Arc<SharedValues>>,
        shared_net_values: Option<Arc<SharedValues>>,
        /// True when a substituted backend is serving instead of the
        /// built-in engine.
        alternate_backend: bool,
    },
    Outputs(Vec<bool>),
    /// Outputs were published to the shared buffer under this version.
    OutputsShared { version: u64 },
    Error { message: String, details: Vec<String> },
}

/// The execution interface the compute thread drives. The built-in
/// [`Engine`] implements it; an alternate backend (a JIT, a native module)
/// can be substituted at init time behind the same protocol.
pub trait Backend: Send {
    fn set_inputs(&mut self, pins: &[PinId], values: &[bool]);
    fn run(&mut self, max_steps: Option<usize>) -> usize;
    fn outputs(&self) -> &[bool];
    fn net_values(&self) -> &[bool];
    fn reset(&mut self);
}

impl Backend for Engine {
    fn set_inputs(&mut self, pins: &[PinId], values: &[bool]) {
        Engine::set_inputs(self, pins, values)
    }

    fn run(&mut self, max_steps: Option<usize>) -> usize {
        Engine::run(self, max_steps)
    }

    fn outputs(&self) -> &[bool] {
        Engine::outputs(self)
    }

    fn net_values(&self) -> &[bool] {
        Engine::net_values(self)
    }

    fn reset(&mut self) {
        Engine::reset(self)
    }
}

/// Builds an alternate backend from a packed netlist, or declines and the
/// worker falls back to the built-in engine.
pub type BackendFactory = Box<dyn Fn(&PackedNetlist) -> Option<Box<dyn Backend>> + Send>;

/// A handle to a compute thread hosting one engine.
///
/// The caller serializes its own requests: at most one `Run` is in flight
/// at a time, and there is no cancellation. Errors never kill the thread;
/// it reports them and keeps serving.
pub struct Worker {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> Worker {
        Worker::spawn_with_backend(None)
    }

    pub fn spawn_with_backend(factory: Option<BackendFactory>) -> Worker {
        let (request_tx, request_rx) = channel();
        let (response_tx, response_rx) = channel();
        let handle = std::thread::spawn(move || serve(request_rx, response_tx, factory));
        Worker {
            requests: request_tx,
            responses: response_rx,
            handle: Some(handle),
        }
    }

    pub fn send(&self, request: Request) {
        if self.requests.send(request).is_err() {
            warn!("compute thread is gone; request dropped");
        }
    }

    pub fn recv(&self) -> Result<Response, RecvError> {
        self.responses.recv()
    }

    pub fn try_recv(&self) -> Option<Response> {
        self.responses.try_recv().ok()
    }

    pub fn shutdown(mut self) {
        self.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Session {
    backend: Box<dyn Backend>,
    shared_outputs: Option<Arc<SharedValues>>,
    shared_net_values: Option<Arc<SharedValues>>,
}

fn serve(requests: Receiver<Request>, responses: Sender<Response>, factory: Option<BackendFactory>) {
    let mut session: Option<Session> = None;

    for request in requests {
        match request {
            Request::Init { packed, shared } => {
                if let Err(problems) = packed.validate() {
                    let _ = responses.send(Response::Error {
                        message: "bad packed netlist".to_string(),
                        details: problems,
                    });
                    continue;
                }

                let mut alternate = false;
                let backend: Box<dyn Backend> = match factory.as_ref().and_then(|f| f(&packed)) {
                    Some(backend) => {
                        alternate = true;
                        backend
                    }
                    None => Box::new(Engine::new(packed.clone())),
                };

                let shared_outputs = shared.outputs.then(|| Arc::new(SharedValues::new(packed.outputs.len())));
                let shared_net_values = shared.net_values.then(|| Arc::new(SharedValues::new(packed.net_count)));

                let _ = responses.send(Response::Ready {
                    net_count: packed.net_count,
                    comp_count: packed.gate_count(),
                    input_count: packed.inputs.len(),
                    output_count: packed.outputs.len(),
                    shared_outputs: shared_outputs.clone(),
                    shared_net_values: shared_net_values.clone(),
                    alternate_backend: alternate,
                });
                info!(
                    "compute thread serving {} gates over {} nets (alternate backend: {alternate})",
                    packed.gate_count(),
                    packed.net_count
                );

                session = Some(Session {
                    backend,
                    shared_outputs,
                    shared_net_values,
                });
            }
            Request::SetInputs { pins, values } => match session.as_mut() {
                Some(session) => {
                    if pins.len() != values.len() {
                        let _ = responses.send(Response::Error {
                            message: format!("set_inputs got {} pins but {} values", pins.len(), values.len()),
                            details: vec![],
                        });
                        continue;
                    }
                    session.backend.set_inputs(&pins, &values);
                }
                None => {
                    let _ = responses.send(not_initialized());
                }
            },
            Request::Run { max_steps } => match session.as_mut() {
                Some(session) => {
                    session.backend.run(max_steps);
                    if let Some(shared) = &session.shared_net_values {
                        shared.publish(session.backend.net_values());
                    }
                    let reply = match &session.shared_outputs {
                        Some(shared) => {
                            let version = shared.publish(session.backend.outputs());
                            Response::OutputsShared { version }
                        }
                        None => Response::Outputs(session.backend.outputs().to_vec()),
                    };
                    let _ = responses.send(reply);
                }
                None => {
                    let _ = responses.send(not_initialized());
                }
            },
            Request::Reset => match session.as_mut() {
                Some(session) => {
                    session.backend.reset();
                    if let Some(shared) = &session.shared_outputs {
                        shared.reset();
                    }
                    if let Some(shared) = &session.shared_net_values {
                        shared.reset();
                    }
                }
                None => {
                    let _ = responses.send(not_initialized());
                }
            },
            Request::Shutdown => break,
        }
    }
    debug!("compute thread stopped");
}

fn not_initialized() -> Response {
    Response::Error {
        message: "no netlist installed; send init first".to_string(),
        details: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::two_gate_chain;

    fn packed_chain() -> PackedNetlist {
        let library = Library::new();
        let netlist = compile(&two_gate_chain(), &library);
        pack(&netlist, &PackOptions::default()).unwrap()
    }

    fn init(worker: &Worker, shared: SharedConfig) -> Response {
        worker.send(Request::Init { packed: packed_chain(), shared });
        worker.recv().unwrap()
    }

    #[test]
    fn init_reports_counts() {
        let worker = Worker::spawn();
        match init(&worker, SharedConfig::default()) {
            Response::Ready { comp_count, input_count, output_count, alternate_backend, .. } => {
                assert_eq!(comp_count, 2);
                assert_eq!(input_count, 2);
                assert_eq!(output_count, 1);
                assert!(!alternate_backend);
            }
            other => panic!("expected ready, got {other:?}"),
        }
        worker.shutdown();
    }

    #[test]
    fn run_round_trip() {
        let worker = Worker::spawn();
        init(&worker, SharedConfig::default());

        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::Outputs(values) => assert_eq!(values, vec![false]),
            other => panic!("expected outputs, got {other:?}"),
        }

        worker.send(Request::SetInputs { pins: vec![0, 1], values: vec![true, true] });
        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::Outputs(values) => assert_eq!(values, vec![true]),
            other => panic!("expected outputs, got {other:?}"),
        }
        worker.shutdown();
    }

    #[test]
    fn shared_mode_publishes_versions() {
        let worker = Worker::spawn();
        let shared = match init(&worker, SharedConfig { outputs: true, net_values: false }) {
            Response::Ready { shared_outputs: Some(shared), shared_net_values: None, .. } => shared,
            other => panic!("expected shared ready, got {other:?}"),
        };

        worker.send(Request::Run { max_steps: None });
        let version = match worker.recv().unwrap() {
            Response::OutputsShared { version } => version,
            other => panic!("expected shared outputs, got {other:?}"),
        };
        assert_eq!(version, 1);
        assert_eq!(shared.snapshot(), (vec![false], 1));

        worker.send(Request::SetInputs { pins: vec![0, 1], values: vec![true, true] });
        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::OutputsShared { version } => assert_eq!(version, 2),
            other => panic!("expected shared outputs, got {other:?}"),
        }
        assert_eq!(shared.snapshot(), (vec![true], 2));

        worker.send(Request::Reset);
        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::OutputsShared { version } => assert_eq!(version, 1),
            other => panic!("expected shared outputs, got {other:?}"),
        }
        worker.shutdown();
    }

    #[test]
    fn requests_before_init_report_errors_and_serving_continues() {
        let worker = Worker::spawn();
        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::Error { message, .. } => assert!(message.contains("init")),
            other => panic!("expected error, got {other:?}"),
        }

        match init(&worker, SharedConfig::default()) {
            Response::Ready { .. } => (),
            other => panic!("expected ready, got {other:?}"),
        }
        worker.shutdown();
    }

    #[test]
    fn alternate_backend_is_substituted() {
        struct Stuck(Vec<bool>);
        impl Backend for Stuck {
            fn set_inputs(&mut self, _pins: &[PinId], _values: &[bool]) {}
            fn run(&mut self, _max_steps: Option<usize>) -> usize {
                0
            }
            fn outputs(&self) -> &[bool] {
                &self.0
            }
            fn net_values(&self) -> &[bool] {
                &self.0
            }
            fn reset(&mut self) {}
        }

        let factory: BackendFactory = Box::new(|packed| Some(Box::new(Stuck(vec![true; packed.outputs.len()]))));
        let worker = Worker::spawn_with_backend(Some(factory));
        match init(&worker, SharedConfig::default()) {
            Response::Ready { alternate_backend, .. } => assert!(alternate_backend),
            other => panic!("expected ready, got {other:?}"),
        }

        worker.send(Request::Run { max_steps: None });
        match worker.recv().unwrap() {
            Response::Outputs(values) => assert_eq!(values, vec![true]),
            other => panic!("expected outputs, got {other:?}"),
        }
        worker.shutdown();
    }
}

//! A simulated node: router, position and applications

use manet_core::{DataPacket, NodeId, RoutingError, SimTime};
use manet_routing::AodvRouter;

use crate::app::{Application, EchoClient, EchoServer, PacketHandler};
use crate::topology::Position;

pub struct Node {
    id: NodeId,
    position: Position,
    router: AodvRouter,
    apps: Vec<Application>,
}

impl Node {
    pub fn new(id: NodeId, position: Position, router: AodvRouter) -> Self {
        Self {
            id,
            position,
            router,
            apps: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn router(&self) -> &AodvRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut AodvRouter {
        &mut self.router
    }

    pub fn install(&mut self, app: Application) {
        self.apps.push(app);
    }

    pub fn apps(&self) -> &[Application] {
        &self.apps
    }

    pub fn echo_client(&self) -> Option<&EchoClient> {
        self.apps.iter().find_map(|app| match app {
            Application::EchoClient(client) => Some(client),
            _ => None,
        })
    }

    pub fn echo_client_mut(&mut self) -> Option<&mut EchoClient> {
        self.apps.iter_mut().find_map(|app| match app {
            Application::EchoClient(client) => Some(client),
            _ => None,
        })
    }

    pub fn echo_server(&self) -> Option<&EchoServer> {
        self.apps.iter().find_map(|app| match app {
            Application::EchoServer(server) => Some(server),
            _ => None,
        })
    }
}

impl PacketHandler for Node {
    fn on_receive(&mut self, packet: &DataPacket, now: SimTime) -> Vec<DataPacket> {
        self.apps
            .iter_mut()
            .flat_map(|app| app.on_receive(packet, now))
            .collect()
    }

    fn on_send_complete(&mut self, packet: &DataPacket, result: &Result<(), RoutingError>, now: SimTime) {
        for app in &mut self.apps {
            app.on_send_complete(packet, result, now);
        }
    }
}

mod convert;
/// Typed proxies for the MPRIS interfaces
pub mod proxy;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, instrument};
use zbus::{
    Connection, fdo,
    names::OwnedBusName,
    proxy::CacheProperties,
    zvariant::{ObjectPath, OwnedValue},
};

use self::proxy::{MediaPlayer2PlayerProxy, MediaPlayer2Proxy};
use super::{
    Bus, BusError, BusEvent, EventSink, MPRIS_PATH, MPRIS_PREFIX, MethodCall, PropMap, PropValue,
    PropertyWrite, Subscription,
};

const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// [`Bus`] implementation on top of a `zbus` connection
#[derive(Clone, Debug)]
pub struct DBusBus {
    connection: Connection,
}

impl DBusBus {
    /// Wrap an existing connection
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Connect to the session bus
    ///
    /// # Errors
    /// Returns error if the session bus is unreachable
    #[instrument]
    pub async fn session() -> Result<Self, BusError> {
        let connection = Connection::session().await?;
        info!("Connected to D-Bus session bus");
        Ok(Self::new(connection))
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    fn owned_name(bus_name: &str) -> Result<OwnedBusName, BusError> {
        OwnedBusName::try_from(bus_name).map_err(|e| BusError::InvalidName {
            name: bus_name.to_owned(),
            reason: e.to_string(),
        })
    }

    async fn player_proxy(
        &self,
        bus_name: &str,
    ) -> Result<MediaPlayer2PlayerProxy<'static>, BusError> {
        Ok(MediaPlayer2PlayerProxy::builder(&self.connection)
            .destination(Self::owned_name(bus_name)?)?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn root_proxy(&self, bus_name: &str) -> Result<MediaPlayer2Proxy<'static>, BusError> {
        Ok(MediaPlayer2Proxy::builder(&self.connection)
            .destination(Self::owned_name(bus_name)?)?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }

    async fn properties_proxy(
        &self,
        bus_name: &str,
    ) -> Result<fdo::PropertiesProxy<'static>, BusError> {
        Ok(fdo::PropertiesProxy::builder(&self.connection)
            .destination(Self::owned_name(bus_name)?)?
            .path(MPRIS_PATH)?
            .build()
            .await?)
    }
}

#[async_trait]
impl Bus for DBusBus {
    async fn list_names(&self, prefix: &str) -> Result<Vec<String>, BusError> {
        let dbus_proxy = fdo::DBusProxy::new(&self.connection).await?;
        let names = dbus_proxy.list_names().await?;

        Ok(names
            .into_iter()
            .map(|name| name.to_string())
            .filter(|name| name.starts_with(prefix))
            .collect())
    }

    async fn get_all(&self, bus_name: &str, interface: &str) -> Result<PropMap, BusError> {
        let reply = self
            .connection
            .call_method(
                Some(bus_name),
                MPRIS_PATH,
                Some(PROPERTIES_INTERFACE),
                "GetAll",
                &(interface,),
            )
            .await?;
        let values: HashMap<String, OwnedValue> = reply.body().deserialize()?;

        Ok(convert::prop_map(values))
    }

    async fn get(
        &self,
        bus_name: &str,
        interface: &str,
        property: &str,
    ) -> Result<PropValue, BusError> {
        let reply = self
            .connection
            .call_method(
                Some(bus_name),
                MPRIS_PATH,
                Some(PROPERTIES_INTERFACE),
                "Get",
                &(interface, property),
            )
            .await?;
        let value: OwnedValue = reply.body().deserialize()?;

        convert::prop_value(&value).ok_or_else(|| BusError::MissingProperty {
            property: property.to_owned(),
        })
    }

    async fn call(&self, bus_name: &str, call: MethodCall) -> Result<(), BusError> {
        match call {
            MethodCall::Raise => self.root_proxy(bus_name).await?.raise().await?,
            MethodCall::Quit => self.root_proxy(bus_name).await?.quit().await?,
            call => {
                let player = self.player_proxy(bus_name).await?;
                match call {
                    MethodCall::Previous => player.previous().await?,
                    MethodCall::Next => player.next().await?,
                    MethodCall::Pause => player.pause().await?,
                    MethodCall::PlayPause => player.play_pause().await?,
                    MethodCall::Stop => player.stop().await?,
                    MethodCall::Play => player.play().await?,
                    MethodCall::Seek { offset } => player.seek(offset).await?,
                    MethodCall::SetPosition { track_id, position } => {
                        let track = ObjectPath::try_from(track_id.as_str())
                            .map_err(zbus::Error::from)?;
                        player.set_position(&track, position).await?;
                    }
                    MethodCall::OpenUri { uri } => player.open_uri(&uri).await?,
                    MethodCall::Raise | MethodCall::Quit => {}
                }
            }
        }

        Ok(())
    }

    async fn set(&self, bus_name: &str, write: PropertyWrite) -> Result<(), BusError> {
        match write {
            PropertyWrite::Fullscreen(fullscreen) => {
                self.root_proxy(bus_name)
                    .await?
                    .set_fullscreen(fullscreen)
                    .await?;
            }
            PropertyWrite::Volume(volume) => {
                self.player_proxy(bus_name).await?.set_volume(volume).await?;
            }
            PropertyWrite::LoopStatus(status) => {
                self.player_proxy(bus_name)
                    .await?
                    .set_loop_status(status.as_str())
                    .await?;
            }
            PropertyWrite::Shuffle(shuffle) => {
                self.player_proxy(bus_name)
                    .await?
                    .set_shuffle(shuffle)
                    .await?;
            }
            PropertyWrite::Rate(rate) => {
                self.player_proxy(bus_name).await?.set_rate(rate).await?;
            }
        }

        Ok(())
    }

    #[instrument(skip(self, sink), fields(generation = sink.generation()))]
    async fn subscribe_player(
        &self,
        bus_name: &str,
        sink: EventSink,
    ) -> Result<Subscription, BusError> {
        let properties = self.properties_proxy(bus_name).await?;
        let player = self.player_proxy(bus_name).await?;

        let mut changes = properties.receive_properties_changed().await?;
        let mut seeks = player.receive_seeked().await?;

        let changes_task = {
            let sink = sink.clone();
            let sender = bus_name.to_owned();
            tokio::spawn(async move {
                while let Some(signal) = changes.next().await {
                    let Ok(args) = signal.args() else {
                        continue;
                    };

                    let event = BusEvent::PropertiesChanged {
                        sender: sender.clone(),
                        interface: args.interface_name().to_string(),
                        changed: convert::changed_map(args.changed_properties()),
                        invalidated: args
                            .invalidated_properties()
                            .iter()
                            .map(|name| (*name).to_owned())
                            .collect(),
                    };

                    if !sink.send(event) {
                        break;
                    }
                }
                debug!(player = %sender, "PropertiesChanged forwarding stopped");
            })
        };

        let seeks_task = {
            let sender = bus_name.to_owned();
            tokio::spawn(async move {
                while let Some(signal) = seeks.next().await {
                    let Ok(args) = signal.args() else {
                        continue;
                    };

                    let event = BusEvent::Seeked {
                        sender: sender.clone(),
                        position: *args.position(),
                    };

                    if !sink.send(event) {
                        break;
                    }
                }
                debug!(player = %sender, "Seeked forwarding stopped");
            })
        };

        Ok(Subscription::new(vec![changes_task, seeks_task]))
    }

    #[instrument(skip(self, sink))]
    async fn subscribe_name_owner_changed(
        &self,
        sink: EventSink,
    ) -> Result<Subscription, BusError> {
        let dbus_proxy = fdo::DBusProxy::new(&self.connection).await?;
        let mut name_owner_changed = dbus_proxy.receive_name_owner_changed().await?;

        let task = tokio::spawn(async move {
            while let Some(signal) = name_owner_changed.next().await {
                let Ok(args) = signal.args() else {
                    continue;
                };

                if !args.name().starts_with(MPRIS_PREFIX) {
                    continue;
                }

                let event = BusEvent::NameOwnerChanged {
                    name: args.name().to_string(),
                    old_owner: args.old_owner().as_deref().map(ToString::to_string),
                    new_owner: args.new_owner().as_deref().map(ToString::to_string),
                };

                if !sink.send(event) {
                    break;
                }
            }
            debug!("NameOwnerChanged forwarding stopped");
        });

        info!("Watching MPRIS name ownership changes");
        Ok(Subscription::new(vec![task]))
    }
}

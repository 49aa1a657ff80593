//! Address parsing: text form, nesting rules, kind tags.

use msr_model::{AddressError, GroupSchema, ResourceAddress, ResourceKind, TransportFlavor};

#[test]
fn parses_server_child_address() {
    let addr: ResourceAddress = "server=default/acceptor=netty".parse().unwrap();
    assert_eq!(addr.len(), 2);
    assert_eq!(addr.server_name(), Some("default"));
    assert_eq!(addr.name(), Some("netty"));
    assert_eq!(addr.kind(), Some(ResourceKind::Acceptor(TransportFlavor::Generic)));
    assert_eq!(addr.to_string(), "server=default/acceptor=netty");
}

#[test]
fn flavoured_and_group_tags_resolve_to_one_kind_each() {
    let addr: ResourceAddress = "server=a/in-vm-connector=local".parse().unwrap();
    assert_eq!(addr.kind(), Some(ResourceKind::Connector(TransportFlavor::InVm)));

    let addr: ResourceAddress = "server=a/jgroups-discovery-group=dg".parse().unwrap();
    assert_eq!(
        addr.kind(),
        Some(ResourceKind::DiscoveryGroup(GroupSchema::JGroups))
    );
    let legacy = addr
        .sibling(addr.kind().unwrap().legacy_counterpart().unwrap())
        .unwrap();
    assert_eq!(legacy.to_string(), "server=a/discovery-group=dg");
}

#[test]
fn role_must_live_under_security_setting() {
    assert!("server=a/security-setting=#/role=guest"
        .parse::<ResourceAddress>()
        .is_ok());
    let err = "server=a/role=guest".parse::<ResourceAddress>().unwrap_err();
    assert!(matches!(err, AddressError::InvalidNesting { .. }));
}

#[test]
fn root_level_connector_is_allowed_but_root_queue_is_not() {
    assert!("remote-connector=ext".parse::<ResourceAddress>().is_ok());
    assert!(matches!(
        "queue=q1".parse::<ResourceAddress>().unwrap_err(),
        AddressError::InvalidNesting { .. }
    ));
}

#[test]
fn malformed_segments_are_rejected() {
    assert!(matches!(
        "server".parse::<ResourceAddress>().unwrap_err(),
        AddressError::MalformedSegment { .. }
    ));
    assert!(matches!(
        "server=".parse::<ResourceAddress>().unwrap_err(),
        AddressError::EmptyName { .. }
    ));
    assert!(matches!(
        "server=a/topic=t".parse::<ResourceAddress>().unwrap_err(),
        AddressError::UnknownKind(_)
    ));
}

#[test]
fn address_serializes_as_string() {
    let addr = ResourceAddress::server("default").append(ResourceKind::Queue, "q1");
    let json = serde_json::to_string(&addr).unwrap();
    assert_eq!(json, "\"server=default/queue=q1\"");
    let back: ResourceAddress = serde_json::from_str(&json).unwrap();
    assert_eq!(back, addr);
}

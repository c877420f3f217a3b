//! End-to-end coverage of the pieces a real embedder wires together: building a [`Server`],
//! populating its address space, and driving it through a [`Runner`] with a test-double network
//! layer standing in for a real transport.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use opcua_core::{
    error::Result,
    external_namespace::{AddNodesItem, ExternalNodeStore, ReadValueId, WriteValue},
    job::Job,
    network::NetworkLayer,
    node::{MethodCallback, Reference},
    service,
    store::{NodeStore, BASE_OBJECT_TYPE, OBJECTS_FOLDER, ORGANIZES},
    ua::{
        self, AccessLevel, AttributeId, Argument, CommonAttributes, DataValue, MethodAttributes,
        NodeAttributes, NodeId, QualifiedName, ScalarValue, Variant, VariableAttributes,
    },
    value_access::{DataSource, DataSourceReadContext, DataSourceWriteContext},
    ServerBuilder,
};

fn add_variable(store: &NodeStore, name: &str, attrs: VariableAttributes) -> NodeId {
    store
        .add_node(
            1,
            &OBJECTS_FOLDER,
            &ORGANIZES,
            None,
            QualifiedName::new(1, name),
            Some(BASE_OBJECT_TYPE),
            NodeAttributes::Variable(attrs),
        )
        .expect("add_node succeeds")
}

#[test]
fn anonymous_read_of_local_variable() {
    let (server, _runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_dispatcher(|_server, _job| {})
        .build();

    let node_id = add_variable(
        &server.store,
        "Temperature",
        VariableAttributes {
            common: CommonAttributes::default(),
            value: Variant::scalar(ScalarValue::Double(21.5)),
            access_level: AccessLevel::CURRENT_READ,
            minimum_sampling_interval: 0.0,
            historizing: false,
        },
    );

    let results = service::read(
        &server,
        vec![ReadValueId {
            node_id,
            attribute_id: AttributeId::Value,
            range: None,
        }],
        false,
    );

    assert_eq!(results.len(), 1);
    let value = results.into_iter().next().unwrap().expect("read succeeds");
    assert!(value.status().is_good());
    assert_eq!(value.value().as_scalar(), Some(&ScalarValue::Double(21.5)));
}

/// A data source backing a small in-memory array, exercised through a numeric-range write.
struct ArrayDataSource(Mutex<Vec<i32>>);

impl DataSource for ArrayDataSource {
    fn read(&self, ctx: &DataSourceReadContext<'_>) -> Result<DataValue> {
        let values: Vec<ScalarValue> = self
            .0
            .lock()
            .unwrap()
            .iter()
            .map(|v| ScalarValue::Int32(*v))
            .collect();
        let _ = ctx;
        Ok(DataValue::good(Variant::array(values)))
    }

    fn write(&self, ctx: &DataSourceWriteContext<'_>) -> Result<()> {
        let range = ctx.range.expect("numeric range write");
        let incoming: Vec<i32> = ctx
            .value
            .value()
            .as_array()
            .expect("array value")
            .iter()
            .map(|v| match v {
                ScalarValue::Int32(v) => *v,
                _ => panic!("expected Int32"),
            })
            .collect();
        let mut guard = self.0.lock().unwrap();
        range.splice(&mut guard, &incoming)
    }
}

#[test]
fn numeric_range_write_through_data_source() {
    let (server, _runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_dispatcher(|_server, _job| {})
        .build();

    let node_id = server
        .store
        .add_node(
            1,
            &OBJECTS_FOLDER,
            &ORGANIZES,
            None,
            QualifiedName::new(1, "Samples"),
            Some(BASE_OBJECT_TYPE),
            NodeAttributes::Variable(VariableAttributes {
                common: CommonAttributes::default(),
                value: Variant::array(vec![ScalarValue::Int32(0); 5]),
                access_level: AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE,
                minimum_sampling_interval: 0.0,
                historizing: false,
            }),
        )
        .unwrap();

    // Swap the inline value source for a data source after creation, as an embedder would when
    // wiring up a live measurement buffer.
    server
        .store
        .set_data_source(&node_id, Box::new(ArrayDataSource(Mutex::new(vec![0, 0, 0, 0, 0]))))
        .unwrap();

    let write_results = service::write(
        &server,
        vec![WriteValue {
            node_id: node_id.clone(),
            attribute_id: AttributeId::Value,
            range: Some(ua::NumericRange::single_dimension(1, 3)),
            value: DataValue::good(Variant::array(vec![
                ScalarValue::Int32(10),
                ScalarValue::Int32(20),
                ScalarValue::Int32(30),
            ])),
        }],
    );
    write_results.into_iter().next().unwrap().expect("ranged write succeeds");

    let read_results = service::read(
        &server,
        vec![ReadValueId {
            node_id: node_id.clone(),
            attribute_id: AttributeId::Value,
            range: None,
        }],
        false,
    );
    let value = read_results.into_iter().next().unwrap().expect("read succeeds");
    assert_eq!(
        value.value().as_array(),
        Some(
            [
                ScalarValue::Int32(0),
                ScalarValue::Int32(10),
                ScalarValue::Int32(20),
                ScalarValue::Int32(30),
                ScalarValue::Int32(0),
            ]
            .as_slice()
        )
    );
}

/// A read-only external store standing in for a namespace an embedder delegates elsewhere
/// entirely (e.g. a historian or a bridge to another server).
struct StaticExternalStore(Variant);

impl ExternalNodeStore for StaticExternalStore {
    fn read(&self, items: &[ReadValueId]) -> Vec<Result<DataValue>> {
        items
            .iter()
            .map(|_| Ok(DataValue::good(self.0.clone())))
            .collect()
    }

    fn write(&self, items: &[WriteValue]) -> Vec<Result<()>> {
        items
            .iter()
            .map(|_| Err(opcua_core::error::Error::not_writable("read-only external store")))
            .collect()
    }

    fn browse(&self, node_ids: &[NodeId]) -> Vec<Result<Vec<Reference>>> {
        node_ids.iter().map(|_| Ok(Vec::new())).collect()
    }

    fn translate_browse_paths_to_node_ids(
        &self,
        paths: &[opcua_core::external_namespace::BrowsePath],
    ) -> Vec<Result<Vec<NodeId>>> {
        paths.iter().map(|_| Ok(Vec::new())).collect()
    }

    fn add_nodes(&self, items: &[AddNodesItem]) -> Vec<Result<NodeId>> {
        items
            .iter()
            .map(|_| Err(opcua_core::error::Error::not_supported("read-only external store")))
            .collect()
    }

    fn delete_nodes(&self, node_ids: &[NodeId]) -> Vec<Result<()>> {
        node_ids
            .iter()
            .map(|_| Err(opcua_core::error::Error::not_supported("read-only external store")))
            .collect()
    }
}

#[test]
fn batched_read_routes_local_and_external_items_and_preserves_order() {
    let (server, _runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_dispatcher(|_server, _job| {})
        .build();

    let local_id = add_variable(
        &server.store,
        "Local",
        VariableAttributes {
            common: CommonAttributes::default(),
            value: Variant::scalar(ScalarValue::Int32(1)),
            access_level: AccessLevel::CURRENT_READ,
            minimum_sampling_interval: 0.0,
            historizing: false,
        },
    );

    server
        .namespaces
        .write()
        .register_external(
            2,
            Arc::new(StaticExternalStore(Variant::scalar(ScalarValue::Int32(99)))),
        )
        .unwrap();

    let items = vec![
        ReadValueId {
            node_id: NodeId::numeric(2, 1),
            attribute_id: AttributeId::Value,
            range: None,
        },
        ReadValueId {
            node_id: local_id,
            attribute_id: AttributeId::Value,
            range: None,
        },
    ];

    let results = service::read(&server, items, false);
    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().expect("external read succeeds");
    let second = results[1].as_ref().expect("local read succeeds");
    assert_eq!(first.value().as_scalar(), Some(&ScalarValue::Int32(99)));
    assert_eq!(second.value().as_scalar(), Some(&ScalarValue::Int32(1)));
}

struct EchoMethod;

impl MethodCallback for EchoMethod {
    fn call(&self, _object_id: &NodeId, inputs: &[Variant]) -> Result<Vec<Variant>> {
        Ok(inputs.to_vec())
    }
}

#[test]
fn method_call_reports_argument_type_mismatch_without_running_the_callback() {
    let (server, _runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_dispatcher(|_server, _job| {})
        .build();

    let method_id = server
        .store
        .add_node(
            1,
            &OBJECTS_FOLDER,
            &ORGANIZES,
            None,
            QualifiedName::new(1, "Echo"),
            None,
            NodeAttributes::Method(MethodAttributes {
                common: CommonAttributes::default(),
                executable: true,
                input_arguments: vec![Argument::new("value", NodeId::ns0(6))], // Int32
                output_arguments: vec![Argument::new("value", NodeId::ns0(6))],
            }),
        )
        .unwrap();
    server
        .store
        .set_method_callback(&method_id, Arc::new(EchoMethod))
        .unwrap();

    let result = service::call(
        &server,
        &OBJECTS_FOLDER,
        &method_id,
        &[Variant::scalar(ScalarValue::String("wrong type".into()))],
    )
    .expect("call does not error on a per-input validation failure");

    assert!(result.output_arguments.is_empty());
    assert_eq!(result.input_argument_results.len(), 1);
    assert!(result.input_argument_results[0].is_bad());

    let good = service::call(
        &server,
        &OBJECTS_FOLDER,
        &method_id,
        &[Variant::scalar(ScalarValue::Int32(7))],
    )
    .expect("call succeeds");
    assert!(good.input_argument_results[0].is_good());
    assert_eq!(good.output_arguments, vec![Variant::scalar(ScalarValue::Int32(7))]);
}

/// A network layer that hands the loop one job on its first poll, then nothing, and reports
/// whatever it was given to [`NetworkLayer::stop`] as still in flight.
struct OneShotLayer {
    url: String,
    pending: Option<Job>,
}

impl NetworkLayer for OneShotLayer {
    fn discovery_url(&self) -> &str {
        &self.url
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_jobs(&mut self, _timeout: Duration) -> Result<Vec<Job>> {
        Ok(self.pending.take().into_iter().collect())
    }

    fn stop(&mut self) -> Vec<Job> {
        Vec::new()
    }

    fn delete_members(&mut self) {}
}

#[test]
fn runner_dispatches_jobs_and_shuts_down_cleanly() {
    let dispatched = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dispatched);

    let context: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
    let (server, mut runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_network_layer(Box::new(OneShotLayer {
            url: "opc.tcp://127.0.0.1:0".into(),
            pending: Some(Job::DecodedRequest(context)),
        }))
        .with_dispatcher(move |_server, job| {
            assert!(matches!(job, Job::DecodedRequest(_)));
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let repeated_hits = Arc::new(AtomicUsize::new(0));
    let repeated_counter = Arc::clone(&repeated_hits);
    server
        .add_repeated_job(
            Duration::from_millis(6),
            Box::new(move || {
                repeated_counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    let stop_handle = runner.stop_handle();
    let handle = thread::spawn(move || runner.run());
    thread::sleep(Duration::from_millis(60));
    stop_handle.store(false, Ordering::SeqCst);
    handle.join().unwrap().expect("runner exits cleanly");

    assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    assert!(repeated_hits.load(Ordering::SeqCst) >= 1);
}

#[test]
fn repeated_job_interval_at_minimum_is_rejected() {
    let (server, _runner) = ServerBuilder::new("urn:test:server", "Test Server")
        .with_dispatcher(|_server, _job| {})
        .build();

    assert!(server
        .add_repeated_job(Duration::from_millis(5), Box::new(|| {}))
        .is_err());
    assert!(server
        .add_repeated_job(Duration::from_millis(6), Box::new(|| {}))
        .is_ok());
}

//! Program-number registry.
//!
//! Every SOSS RPC service is addressed by four numeric "program numbers"
//! (client/server x send/receive) on the legacy RPC transport. The client
//! SEND program is the one the server receives the initiating packet on, so
//! the client-side pair is the mirror of the server-side pair.
//!
//! The registry is populated once at startup and never mutated; it is passed
//! explicitly to the components that need it. The numeric values are a
//! versioned, additive-only contract: new keys may be added, existing values
//! must never change.

use std::collections::BTreeMap;
use std::io;

use super::error::UnknownServiceError;

/// The four program numbers addressing one logical service.
///
/// One-way services (status feeds) have no reply program, so the server-send
/// and client-receive sides may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramNumbers {
    /// Program the server sends replies on.
    pub server_send: Option<u32>,
    /// Program the server receives initiating packets on.
    pub server_receive: u32,
    /// Program the client sends initiating packets on (== server receive).
    pub client_send: u32,
    /// Program the client receives replies on (== server send).
    pub client_receive: Option<u32>,
}

/// Portmapper-style service directory used for best-effort deregistration.
///
/// Implementations cover whatever protocol mappings (TCP/UDP) the directory
/// holds for a program number; `unset` reports whether any mapping was
/// removed.
pub trait ServiceDirectory {
    /// Remove the directory entry for `program`, reporting whether one
    /// existed.
    fn unset(&self, program: u32) -> io::Result<bool>;
}

/// Immutable service-key to program-number table.
#[derive(Debug, Clone)]
pub struct ProgramNumberRegistry {
    // key -> (client send, client receive)
    table: BTreeMap<String, (u32, Option<u32>)>,
}

impl ProgramNumberRegistry {
    /// Build the standard Subaru summit table.
    pub fn builtin() -> Self {
        let mut t: BTreeMap<String, (u32, Option<u32>)> = BTreeMap::new();

        // OBS <--> OSS command channels, banks A and B.
        for i in 0..=9u32 {
            t.insert(
                format!("OBStoOSSA{i}"),
                (0x2101_0001 + (i << 8), Some(0x2102_0001 + (i << 8))),
            );
            t.insert(
                format!("OBStoOSSB{i}"),
                (0x2101_0002 + (i << 8), Some(0x2102_0002 + (i << 8))),
            );
        }

        // Status monitor units; most OBCPs send status to unit 3.
        for i in 1..=5u32 {
            t.insert(format!("toOBS{i}(sdst)"), (0x2103_0020 + i, None));
        }
        t.insert("ScreenGetOBS".into(), (0x2104_0034, None));

        // OWS, OBC, VGW, OBCP to OBS.
        t.insert("OBCPtoOBS(thru)".into(), (0x2101_0011, Some(0x2102_0011)));
        t.insert("OBCPtoOBS(sreq)".into(), (0x2101_0012, Some(0x2102_0012)));

        // OBS <--> OBCP command interface.
        for i in 1..=32u32 {
            t.insert(
                format!("OBStoOBCP{i}(cmd)"),
                (0x2101_0003 + (i << 8), Some(0x2102_0003 + (i << 8))),
            );
        }
        t.insert("OBStoOBCP33(cmd)".into(), (0x2101_0002, Some(0x2102_0002))); // VGW
        // TSC simulator and ANA interface aliases.
        t.insert("OBStoOBCP89(cmd)".into(), (0x2101_5903, Some(0x2102_5903)));
        t.insert("OBStoOBCP99(cmd)".into(), (0x2101_0102, Some(0x2102_0102)));

        // OBC <--> OBCP FITS transfer coordination.
        for i in 1..=32u32 {
            t.insert(
                format!("OBCP{i}toOBC(file)"),
                (0x2101_0041 + (i << 8), Some(0x2102_0041 + (i << 8))),
            );
        }
        t.insert("OBCP33toOBC(file)".into(), (0x2101_0042, Some(0x2102_0042))); // VGW

        // OBC <--> OBCP RPC FITS transfer.
        for i in 1..=32u32 {
            t.insert(
                format!("OBCP{i}toOBC(rpc)"),
                (0x2101_0051 + (i << 8), Some(0x2102_0051 + (i << 8))),
            );
        }
        t.insert("OBCP33toOBC(rpc)".into(), (0x2101_2052, Some(0x2102_2052))); // VGW

        // OBC <--> STARS file transfer: 1-2 summit, 5-6 simulator.
        for i in 1..=8u32 {
            t.insert(
                format!("OBCtoSTARS{i}"),
                (0x2200_0001 + (i << 8), Some(0x2200_0002 + (i << 8))),
            );
        }

        // Guide-image feeds (TCP).
        t.insert("AGtoVGW".into(), (0x2000_0021, Some(0x2000_0021)));
        t.insert("SVtoVGW".into(), (0x2000_0027, Some(0x2000_0027)));
        t.insert("SHtoVGW".into(), (0x2000_0024, Some(0x2000_0024)));
        t.insert("FMOStoVGW".into(), (0x2000_0030, Some(0x2000_0030)));
        t.insert("HSCSCAGtoVGW".into(), (0x2000_0032, Some(0x2000_0032)));
        t.insert("HSCSHAGtoVGW".into(), (0x2000_0034, Some(0x2000_0034)));
        t.insert("HSCSHtoVGW".into(), (0x2000_0036, Some(0x2000_0036)));

        // ANA functions (ANA also uses OBStoOSSB1).
        t.insert("ANAxxx1".into(), (0x2104_0030, Some(0x2104_0030)));
        t.insert("ANAxxx2".into(), (0x2104_0031, Some(0x2104_0031)));
        t.insert("ANAxxx3".into(), (0x2104_0035, Some(0x2104_0035)));
        t.insert("ANAxxx4".into(), (0x2104_0036, Some(0x2104_0036)));
        t.insert("OBCtoANA(img)".into(), (0x2300_0101, Some(0x2300_0101)));

        // Telescope status feeds: TSCS (UDP), TSCL (UDP), TSCV (TCP).
        t.insert("TSCS0->".into(), (0x2000_0013, None));
        t.insert("TSCL0->".into(), (0x2000_0014, None));
        t.insert("TSCV0->".into(), (0x2000_0015, None));
        for i in 1..=5u32 {
            t.insert(format!("TSCS{i}->"), (0x2103_0026 + (i << 8), None));
            t.insert(format!("TSCL{i}->"), (0x2103_0027 + (i << 8), None));
            t.insert(format!("TSCV{i}->"), (0x2103_0028 + (i << 8), None));
        }

        // OBS <--> TSC command interface, both directions.
        t.insert("OBS->TSC0".into(), (0x2000_0011, Some(0x2000_0012)));
        t.insert("TSC0->OBS".into(), (0x2000_0012, Some(0x2000_0011)));
        for i in 1..=5u32 {
            t.insert(
                format!("OBS->TSC{i}"),
                (0x2101_0004 + (i << 8), Some(0x2102_0004 + (i << 8))),
            );
            t.insert(
                format!("TSC{i}->OBS"),
                (0x2102_0004 + (i << 8), Some(0x2101_0004 + (i << 8))),
            );
        }

        Self { table: t }
    }

    /// Build a registry from explicit entries (client send, client receive).
    ///
    /// Intended for simulators and tests; production deployments use
    /// [`ProgramNumberRegistry::builtin`].
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, (u32, Option<u32>))>,
        K: Into<String>,
    {
        Self {
            table: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    /// Look up the four program numbers for a service key.
    pub fn lookup(&self, key: &str) -> Result<ProgramNumbers, UnknownServiceError> {
        let (send, recv) = self
            .table
            .get(key)
            .copied()
            .ok_or_else(|| UnknownServiceError { key: key.to_owned() })?;
        Ok(ProgramNumbers {
            server_send: recv,
            server_receive: send,
            client_send: send,
            client_receive: recv,
        })
    }

    /// All service keys known to this registry.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the registry holds no services.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Best-effort deregistration of the given service keys from a directory.
    ///
    /// Never fails: each key's outcome is reported independently and defaults
    /// to `false` on lookup miss or directory failure.
    pub fn unregister<'a, D, I>(&self, directory: &D, keys: I) -> BTreeMap<String, bool>
    where
        D: ServiceDirectory,
        I: IntoIterator<Item = &'a str>,
    {
        let mut outcomes = BTreeMap::new();
        for key in keys {
            let done = match self.lookup(key) {
                Ok(numbers) => directory.unset(numbers.server_receive).unwrap_or(false),
                Err(_) => false,
            };
            outcomes.insert(key.to_owned(), done);
        }
        outcomes
    }

    /// Best-effort deregistration of every key in the registry.
    pub fn unregister_all<D: ServiceDirectory>(&self, directory: &D) -> BTreeMap<String, bool> {
        let keys: Vec<&str> = self.keys().collect();
        self.unregister(directory, keys)
    }
}

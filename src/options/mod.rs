//! DHCPv6 options — RFC 8415 §21 and the extensions enumerated in
//! [`OptionCode`]. `DhcpOptions` is a single, uniform container used both
//! at the top level of a message and inside every nested option (IA_NA,
//! IA_PD, the S46 containers, ...); `DhcpOption` is a closed enum with one
//! variant per recognized option plus [`UnknownOption`] for anything else.
//!
//! Every option body type's [`crate::decoder::Decodable::decode`] assumes
//! its 4-byte code+length header has already been consumed by
//! [`DhcpOption::decode`]; the corresponding
//! [`crate::encoder::Encodable::encode`] writes that header itself. This
//! asymmetry keeps each option's decode bounded to exactly its declared
//! length without threading a separate "remaining" parameter everywhere.

pub mod basic;
pub mod dns;
pub mod dslite;
pub mod ia;
pub mod leasequery;
pub mod map;
pub mod maxrt;
pub mod ntp;
pub mod refresh;
pub mod relay;
pub mod relayopts;
pub mod sip;

pub use basic::{
    Auth, ElapsedTime, InterfaceId, Oro, Preference, RapidCommit, ReconfAccept, ReconfMsg,
    ServerUnicast, UserClass, VendorClass, VendorOpts,
};
pub use dns::{DnsServers, DomainSearchList};
pub use dslite::AftrName;
pub use ia::{IaAddr, IaNa, IaPd, IaPrefix, IaTa, Status, StatusCode};
pub use leasequery::{ClientData, CltTime, LqClientLink, LqQuery, LqRelayData, QueryType, RelayId};
pub use map::{S46Br, S46ContLw, S46ContMape, S46ContMapt, S46Dmr, S46PortParams, S46Rule, S46V4V6Bind};
pub use maxrt::{InfMaxRt, SolMaxRt};
pub use ntp::{NtpServer, NtpSubOption, SntpServers};
pub use refresh::InformationRefreshTime;
pub use relay::RelayMsg;
pub use relayopts::{ClientLinkLayerAddr, RemoteId, SubscriberId};
pub use sip::{SipServerA, SipServerD};

use serde::{Deserialize, Serialize};

use crate::decoder::{Decodable, Decoder};
use crate::duid::Duid;
use crate::encoder::{Encodable, Encoder};
use crate::error::{DecodeError, DecodeResult, EncodeResult};

/// Numeric option codes this crate understands, plus the open-ended
/// `Unknown` case for everything else. The option registry (see
/// `crate::registry`) tracks multiplicity and display names for these
/// codes; this enum is only the wire-format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionCode {
    /// Client Identifier (1)
    ClientId,
    /// Server Identifier (2)
    ServerId,
    /// Identity Association for Non-temporary Addresses (3)
    IaNa,
    /// Identity Association for Temporary Addresses (4)
    IaTa,
    /// IA Address (5)
    IaAddr,
    /// Option Request (6)
    Oro,
    /// Preference (7)
    Preference,
    /// Elapsed Time (8)
    ElapsedTime,
    /// Relay Message (9)
    RelayMsg,
    /// Authentication (11)
    Auth,
    /// Server Unicast (12)
    ServerUnicast,
    /// Status Code (13)
    StatusCode,
    /// Rapid Commit (14)
    RapidCommit,
    /// User Class (15)
    UserClass,
    /// Vendor Class (16)
    VendorClass,
    /// Vendor-specific Information (17)
    VendorOpts,
    /// Interface-ID (18)
    InterfaceId,
    /// Reconfigure Message (19)
    ReconfMsg,
    /// Reconfigure Accept (20)
    ReconfAccept,
    /// SIP Servers Domain Name List (21)
    SipServerD,
    /// SIP Servers IPv6 Address List (22)
    SipServerA,
    /// DNS Recursive Name Server (23)
    DnsServers,
    /// Domain Search List (24)
    DomainList,
    /// Identity Association for Prefix Delegation (25)
    IaPd,
    /// IA Prefix (26)
    IaPrefix,
    /// SNTP Servers, legacy (31)
    SntpServers,
    /// Information Refresh Time (32)
    InformationRefreshTime,
    /// Remote-ID (37)
    RemoteId,
    /// Subscriber-ID (38)
    SubscriberId,
    /// Leasequery Query (44)
    LqQuery,
    /// Leasequery Client Data (45)
    ClientData,
    /// Leasequery Client Last Transaction Time (46)
    CltTime,
    /// Bulk Leasequery Relay Data (47)
    LqRelayData,
    /// Bulk Leasequery Client Link (48)
    LqClientLink,
    /// Bulk Leasequery Relay-ID (53)
    RelayId,
    /// NTP Server (56)
    NtpServer,
    /// DS-Lite AFTR-Name (64)
    AftrName,
    /// Client Link-Layer Address (79)
    ClientLinkLayerAddr,
    /// SOL_MAX_RT (82)
    SolMaxRt,
    /// INF_MAX_RT (83)
    InfMaxRt,
    /// S46 Rule (89)
    S46Rule,
    /// S46 Border Relay (90)
    S46Br,
    /// S46 Default Mapping Rule (91)
    S46Dmr,
    /// S46 IPv4/IPv6 Address Binding (92)
    S46V4V6Bind,
    /// S46 Port Parameters (93)
    S46PortParams,
    /// S46 MAP-E Container (94)
    S46ContMape,
    /// S46 MAP-T Container (95)
    S46ContMapt,
    /// S46 Lightweight 4over6 Container (96)
    S46ContLw,
    /// any code not listed above
    Unknown(u16),
}

impl From<u16> for OptionCode {
    fn from(n: u16) -> Self {
        use OptionCode::*;
        match n {
            1 => ClientId,
            2 => ServerId,
            3 => IaNa,
            4 => IaTa,
            5 => IaAddr,
            6 => Oro,
            7 => Preference,
            8 => ElapsedTime,
            9 => RelayMsg,
            11 => Auth,
            12 => ServerUnicast,
            13 => StatusCode,
            14 => RapidCommit,
            15 => UserClass,
            16 => VendorClass,
            17 => VendorOpts,
            18 => InterfaceId,
            19 => ReconfMsg,
            20 => ReconfAccept,
            21 => SipServerD,
            22 => SipServerA,
            23 => DnsServers,
            24 => DomainList,
            25 => IaPd,
            26 => IaPrefix,
            31 => SntpServers,
            32 => InformationRefreshTime,
            37 => RemoteId,
            38 => SubscriberId,
            44 => LqQuery,
            45 => ClientData,
            46 => CltTime,
            47 => LqRelayData,
            48 => LqClientLink,
            53 => RelayId,
            56 => NtpServer,
            64 => AftrName,
            79 => ClientLinkLayerAddr,
            82 => SolMaxRt,
            83 => InfMaxRt,
            89 => S46Rule,
            90 => S46Br,
            91 => S46Dmr,
            92 => S46V4V6Bind,
            93 => S46PortParams,
            94 => S46ContMape,
            95 => S46ContMapt,
            96 => S46ContLw,
            n => Unknown(n),
        }
    }
}

impl From<OptionCode> for u16 {
    fn from(c: OptionCode) -> u16 {
        use OptionCode::*;
        match c {
            ClientId => 1,
            ServerId => 2,
            IaNa => 3,
            IaTa => 4,
            IaAddr => 5,
            Oro => 6,
            Preference => 7,
            ElapsedTime => 8,
            RelayMsg => 9,
            Auth => 11,
            ServerUnicast => 12,
            StatusCode => 13,
            RapidCommit => 14,
            UserClass => 15,
            VendorClass => 16,
            VendorOpts => 17,
            InterfaceId => 18,
            ReconfMsg => 19,
            ReconfAccept => 20,
            SipServerD => 21,
            SipServerA => 22,
            DnsServers => 23,
            DomainList => 24,
            IaPd => 25,
            IaPrefix => 26,
            SntpServers => 31,
            InformationRefreshTime => 32,
            RemoteId => 37,
            SubscriberId => 38,
            LqQuery => 44,
            ClientData => 45,
            CltTime => 46,
            LqRelayData => 47,
            LqClientLink => 48,
            RelayId => 53,
            NtpServer => 56,
            AftrName => 64,
            ClientLinkLayerAddr => 79,
            SolMaxRt => 82,
            InfMaxRt => 83,
            S46Rule => 89,
            S46Br => 90,
            S46Dmr => 91,
            S46V4V6Bind => 92,
            S46PortParams => 93,
            S46ContMape => 94,
            S46ContMapt => 95,
            S46ContLw => 96,
            Unknown(n) => n,
        }
    }
}

/// An option this crate does not recognize, preserved verbatim so
/// re-encoding an untouched message is byte-identical to the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownOption {
    /// raw option code as seen on the wire
    pub code: u16,
    /// raw option value bytes
    pub data: Vec<u8>,
}

impl Encodable for UnknownOption {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        e.write_u16(self.code)?;
        e.write_u16(self.data.len() as u16)?;
        e.write_slice(&self.data)?;
        Ok(())
    }
}

/// A single decoded DHCPv6 option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DhcpOption {
    /// option 1
    ClientId(Duid),
    /// option 2
    ServerId(Duid),
    /// option 3
    IaNa(IaNa),
    /// option 4
    IaTa(IaTa),
    /// option 5
    IaAddr(IaAddr),
    /// option 6
    Oro(Oro),
    /// option 7
    Preference(Preference),
    /// option 8
    ElapsedTime(ElapsedTime),
    /// option 9
    RelayMsg(RelayMsg),
    /// option 11
    Auth(Auth),
    /// option 12
    ServerUnicast(ServerUnicast),
    /// option 13
    StatusCode(StatusCode),
    /// option 14
    RapidCommit(RapidCommit),
    /// option 15
    UserClass(UserClass),
    /// option 16
    VendorClass(VendorClass),
    /// option 17
    VendorOpts(VendorOpts),
    /// option 18
    InterfaceId(InterfaceId),
    /// option 19
    ReconfMsg(ReconfMsg),
    /// option 20
    ReconfAccept(ReconfAccept),
    /// option 21
    SipServerD(SipServerD),
    /// option 22
    SipServerA(SipServerA),
    /// option 23
    DnsServers(DnsServers),
    /// option 24
    DomainSearchList(DomainSearchList),
    /// option 25
    IaPd(IaPd),
    /// option 26
    IaPrefix(IaPrefix),
    /// option 31
    SntpServers(SntpServers),
    /// option 32
    InformationRefreshTime(InformationRefreshTime),
    /// option 37
    RemoteId(RemoteId),
    /// option 38
    SubscriberId(SubscriberId),
    /// option 44
    LqQuery(LqQuery),
    /// option 45
    ClientData(ClientData),
    /// option 46
    CltTime(CltTime),
    /// option 47
    LqRelayData(LqRelayData),
    /// option 48
    LqClientLink(LqClientLink),
    /// option 53
    RelayId(RelayId),
    /// option 56
    NtpServer(NtpServer),
    /// option 64
    AftrName(AftrName),
    /// option 79
    ClientLinkLayerAddr(ClientLinkLayerAddr),
    /// option 82
    SolMaxRt(SolMaxRt),
    /// option 83
    InfMaxRt(InfMaxRt),
    /// option 89
    S46Rule(S46Rule),
    /// option 90
    S46Br(S46Br),
    /// option 91
    S46Dmr(S46Dmr),
    /// option 92
    S46V4V6Bind(S46V4V6Bind),
    /// option 93
    S46PortParams(S46PortParams),
    /// option 94
    S46ContMape(S46ContMape),
    /// option 95
    S46ContMapt(S46ContMapt),
    /// option 96
    S46ContLw(S46ContLw),
    /// anything else
    Unknown(UnknownOption),
}

impl DhcpOption {
    /// the wire option code for this option
    pub fn code(&self) -> OptionCode {
        use DhcpOption::*;
        match self {
            ClientId(_) => OptionCode::ClientId,
            ServerId(_) => OptionCode::ServerId,
            IaNa(_) => OptionCode::IaNa,
            IaTa(_) => OptionCode::IaTa,
            IaAddr(_) => OptionCode::IaAddr,
            Oro(_) => OptionCode::Oro,
            Preference(_) => OptionCode::Preference,
            ElapsedTime(_) => OptionCode::ElapsedTime,
            RelayMsg(_) => OptionCode::RelayMsg,
            Auth(_) => OptionCode::Auth,
            ServerUnicast(_) => OptionCode::ServerUnicast,
            StatusCode(_) => OptionCode::StatusCode,
            RapidCommit(_) => OptionCode::RapidCommit,
            UserClass(_) => OptionCode::UserClass,
            VendorClass(_) => OptionCode::VendorClass,
            VendorOpts(_) => OptionCode::VendorOpts,
            InterfaceId(_) => OptionCode::InterfaceId,
            ReconfMsg(_) => OptionCode::ReconfMsg,
            ReconfAccept(_) => OptionCode::ReconfAccept,
            SipServerD(_) => OptionCode::SipServerD,
            SipServerA(_) => OptionCode::SipServerA,
            DnsServers(_) => OptionCode::DnsServers,
            DomainSearchList(_) => OptionCode::DomainList,
            IaPd(_) => OptionCode::IaPd,
            IaPrefix(_) => OptionCode::IaPrefix,
            SntpServers(_) => OptionCode::SntpServers,
            InformationRefreshTime(_) => OptionCode::InformationRefreshTime,
            RemoteId(_) => OptionCode::RemoteId,
            SubscriberId(_) => OptionCode::SubscriberId,
            LqQuery(_) => OptionCode::LqQuery,
            ClientData(_) => OptionCode::ClientData,
            CltTime(_) => OptionCode::CltTime,
            LqRelayData(_) => OptionCode::LqRelayData,
            LqClientLink(_) => OptionCode::LqClientLink,
            RelayId(_) => OptionCode::RelayId,
            NtpServer(_) => OptionCode::NtpServer,
            AftrName(_) => OptionCode::AftrName,
            ClientLinkLayerAddr(_) => OptionCode::ClientLinkLayerAddr,
            SolMaxRt(_) => OptionCode::SolMaxRt,
            InfMaxRt(_) => OptionCode::InfMaxRt,
            S46Rule(_) => OptionCode::S46Rule,
            S46Br(_) => OptionCode::S46Br,
            S46Dmr(_) => OptionCode::S46Dmr,
            S46V4V6Bind(_) => OptionCode::S46V4V6Bind,
            S46PortParams(_) => OptionCode::S46PortParams,
            S46ContMape(_) => OptionCode::S46ContMape,
            S46ContMapt(_) => OptionCode::S46ContMapt,
            S46ContLw(_) => OptionCode::S46ContLw,
            Unknown(u) => OptionCode::Unknown(u.code),
        }
    }
}

impl DhcpOption {
    /// decode the body of a known option code, assuming `sub` is bounded
    /// to exactly the option's declared length. Split out from
    /// [`Decodable::decode`] so the caller can catch a structural failure
    /// here (truncation inside the value, a bad enum discriminant) and
    /// downgrade to [`UnknownOption`] per §4.1, rather than failing the
    /// whole message.
    fn decode_known(code: OptionCode, body: &[u8], sub: &mut Decoder<'_>) -> DecodeResult<Self> {
        Ok(match code {
            OptionCode::ClientId => DhcpOption::ClientId(Duid::decode(sub)?),
            OptionCode::ServerId => DhcpOption::ServerId(Duid::decode(sub)?),
            OptionCode::IaNa => DhcpOption::IaNa(IaNa::decode(sub)?),
            OptionCode::IaTa => DhcpOption::IaTa(IaTa::decode(sub)?),
            OptionCode::IaAddr => DhcpOption::IaAddr(IaAddr::decode(sub)?),
            OptionCode::Oro => DhcpOption::Oro(Oro::decode(sub)?),
            OptionCode::Preference => DhcpOption::Preference(Preference::decode(sub)?),
            OptionCode::ElapsedTime => DhcpOption::ElapsedTime(ElapsedTime::decode(sub)?),
            OptionCode::RelayMsg => DhcpOption::RelayMsg(RelayMsg::decode(sub)?),
            OptionCode::Auth => DhcpOption::Auth(Auth::decode(sub)?),
            OptionCode::ServerUnicast => {
                DhcpOption::ServerUnicast(ServerUnicast::decode(sub)?)
            }
            OptionCode::StatusCode => DhcpOption::StatusCode(StatusCode::decode(sub)?),
            OptionCode::RapidCommit => DhcpOption::RapidCommit(RapidCommit::decode(sub)?),
            OptionCode::UserClass => DhcpOption::UserClass(UserClass::decode(sub)?),
            OptionCode::VendorClass => DhcpOption::VendorClass(VendorClass::decode(sub)?),
            OptionCode::VendorOpts => DhcpOption::VendorOpts(VendorOpts::decode(sub)?),
            OptionCode::InterfaceId => DhcpOption::InterfaceId(InterfaceId::decode(sub)?),
            OptionCode::ReconfMsg => DhcpOption::ReconfMsg(ReconfMsg::decode(sub)?),
            OptionCode::ReconfAccept => {
                DhcpOption::ReconfAccept(ReconfAccept::decode(sub)?)
            }
            OptionCode::SipServerD => DhcpOption::SipServerD(SipServerD::decode(sub)?),
            OptionCode::SipServerA => DhcpOption::SipServerA(SipServerA::decode(sub)?),
            OptionCode::DnsServers => DhcpOption::DnsServers(DnsServers::decode(sub)?),
            OptionCode::DomainList => {
                DhcpOption::DomainSearchList(DomainSearchList::decode(sub)?)
            }
            OptionCode::IaPd => DhcpOption::IaPd(IaPd::decode(sub)?),
            OptionCode::IaPrefix => DhcpOption::IaPrefix(IaPrefix::decode(sub)?),
            OptionCode::SntpServers => DhcpOption::SntpServers(SntpServers::decode(sub)?),
            OptionCode::InformationRefreshTime => {
                DhcpOption::InformationRefreshTime(InformationRefreshTime::decode(sub)?)
            }
            OptionCode::RemoteId => DhcpOption::RemoteId(RemoteId::decode(sub)?),
            OptionCode::SubscriberId => {
                DhcpOption::SubscriberId(SubscriberId::decode(sub)?)
            }
            OptionCode::LqQuery => DhcpOption::LqQuery(LqQuery::decode(sub)?),
            OptionCode::ClientData => DhcpOption::ClientData(ClientData::decode(sub)?),
            OptionCode::CltTime => DhcpOption::CltTime(CltTime::decode(sub)?),
            OptionCode::LqRelayData => {
                DhcpOption::LqRelayData(LqRelayData::decode(sub)?)
            }
            OptionCode::LqClientLink => {
                DhcpOption::LqClientLink(LqClientLink::decode(sub)?)
            }
            OptionCode::RelayId => DhcpOption::RelayId(RelayId::decode(sub)?),
            OptionCode::NtpServer => DhcpOption::NtpServer(NtpServer::decode(sub)?),
            OptionCode::AftrName => DhcpOption::AftrName(AftrName::decode(sub)?),
            OptionCode::ClientLinkLayerAddr => {
                DhcpOption::ClientLinkLayerAddr(ClientLinkLayerAddr::decode(sub)?)
            }
            OptionCode::SolMaxRt => DhcpOption::SolMaxRt(SolMaxRt::decode(sub)?),
            OptionCode::InfMaxRt => DhcpOption::InfMaxRt(InfMaxRt::decode(sub)?),
            OptionCode::S46Rule => DhcpOption::S46Rule(S46Rule::decode(sub)?),
            OptionCode::S46Br => DhcpOption::S46Br(S46Br::decode(sub)?),
            OptionCode::S46Dmr => DhcpOption::S46Dmr(S46Dmr::decode(sub)?),
            OptionCode::S46V4V6Bind => {
                DhcpOption::S46V4V6Bind(S46V4V6Bind::decode(sub)?)
            }
            OptionCode::S46PortParams => {
                DhcpOption::S46PortParams(S46PortParams::decode(sub)?)
            }
            OptionCode::S46ContMape => {
                DhcpOption::S46ContMape(S46ContMape::decode(sub)?)
            }
            OptionCode::S46ContMapt => {
                DhcpOption::S46ContMapt(S46ContMapt::decode(sub)?)
            }
            OptionCode::S46ContLw => DhcpOption::S46ContLw(S46ContLw::decode(sub)?),
            OptionCode::Unknown(code) => DhcpOption::Unknown(UnknownOption {
                code,
                data: body.to_vec(),
            }),
        })
    }
}

impl Decodable for DhcpOption {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let code = decoder.read_u16()?;
        let len = decoder.read_u16()? as usize;
        let body = decoder.read_slice(len)?;
        let mut sub = decoder.sub_decoder(body);
        let option_code = OptionCode::from(code);
        match Self::decode_known(option_code, body, &mut sub) {
            Ok(opt) => Ok(opt),
            // the recursion limit is a resource bound, not a tolerance
            // knob: exceeding it always fails the whole message (§4.1).
            Err(err @ DecodeError::RecursionLimit(_)) => Err(err),
            Err(_) if !matches!(option_code, OptionCode::Unknown(_)) => {
                decoder.mark_partially_decoded();
                Ok(DhcpOption::Unknown(UnknownOption {
                    code,
                    data: body.to_vec(),
                }))
            }
            Err(err) => Err(err),
        }
    }
}

impl Encodable for DhcpOption {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        match self {
            DhcpOption::ClientId(duid) => {
                e.write_u16(OptionCode::ClientId.into())?;
                e.write_u16(duid.wire_len() as u16)?;
                duid.encode(e)?;
            }
            DhcpOption::ServerId(duid) => {
                e.write_u16(OptionCode::ServerId.into())?;
                e.write_u16(duid.wire_len() as u16)?;
                duid.encode(e)?;
            }
            DhcpOption::IaNa(v) => v.encode(e)?,
            DhcpOption::IaTa(v) => v.encode(e)?,
            DhcpOption::IaAddr(v) => v.encode(e)?,
            DhcpOption::Oro(v) => v.encode(e)?,
            DhcpOption::Preference(v) => v.encode(e)?,
            DhcpOption::ElapsedTime(v) => v.encode(e)?,
            DhcpOption::RelayMsg(v) => v.encode(e)?,
            DhcpOption::Auth(v) => v.encode(e)?,
            DhcpOption::ServerUnicast(v) => v.encode(e)?,
            DhcpOption::StatusCode(v) => v.encode(e)?,
            DhcpOption::RapidCommit(v) => v.encode(e)?,
            DhcpOption::UserClass(v) => v.encode(e)?,
            DhcpOption::VendorClass(v) => v.encode(e)?,
            DhcpOption::VendorOpts(v) => v.encode(e)?,
            DhcpOption::InterfaceId(v) => v.encode(e)?,
            DhcpOption::ReconfMsg(v) => v.encode(e)?,
            DhcpOption::ReconfAccept(v) => v.encode(e)?,
            DhcpOption::SipServerD(v) => v.encode(e)?,
            DhcpOption::SipServerA(v) => v.encode(e)?,
            DhcpOption::DnsServers(v) => v.encode(e)?,
            DhcpOption::DomainSearchList(v) => v.encode(e)?,
            DhcpOption::IaPd(v) => v.encode(e)?,
            DhcpOption::IaPrefix(v) => v.encode(e)?,
            DhcpOption::SntpServers(v) => v.encode(e)?,
            DhcpOption::InformationRefreshTime(v) => v.encode(e)?,
            DhcpOption::RemoteId(v) => v.encode(e)?,
            DhcpOption::SubscriberId(v) => v.encode(e)?,
            DhcpOption::LqQuery(v) => v.encode(e)?,
            DhcpOption::ClientData(v) => v.encode(e)?,
            DhcpOption::CltTime(v) => v.encode(e)?,
            DhcpOption::LqRelayData(v) => v.encode(e)?,
            DhcpOption::LqClientLink(v) => v.encode(e)?,
            DhcpOption::RelayId(v) => v.encode(e)?,
            DhcpOption::NtpServer(v) => v.encode(e)?,
            DhcpOption::AftrName(v) => v.encode(e)?,
            DhcpOption::ClientLinkLayerAddr(v) => v.encode(e)?,
            DhcpOption::SolMaxRt(v) => v.encode(e)?,
            DhcpOption::InfMaxRt(v) => v.encode(e)?,
            DhcpOption::S46Rule(v) => v.encode(e)?,
            DhcpOption::S46Br(v) => v.encode(e)?,
            DhcpOption::S46Dmr(v) => v.encode(e)?,
            DhcpOption::S46V4V6Bind(v) => v.encode(e)?,
            DhcpOption::S46PortParams(v) => v.encode(e)?,
            DhcpOption::S46ContMape(v) => v.encode(e)?,
            DhcpOption::S46ContMapt(v) => v.encode(e)?,
            DhcpOption::S46ContLw(v) => v.encode(e)?,
            DhcpOption::Unknown(v) => v.encode(e)?,
        }
        Ok(())
    }
}

/// A uniform, ordered collection of options. Used for top-level message
/// options and for every nested option container (IA_NA/IA_TA/IA_PD
/// suboptions, S46 container suboptions, leasequery query-options, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DhcpOptions(pub Vec<DhcpOption>);

impl DhcpOptions {
    /// an empty option set
    pub fn new() -> Self {
        DhcpOptions(Vec::new())
    }

    /// the first option matching `code`, if present
    pub fn get(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.0.iter().find(|o| o.code() == code)
    }

    /// a mutable reference to the first option matching `code`, if present
    pub fn get_mut(&mut self, code: OptionCode) -> Option<&mut DhcpOption> {
        self.0.iter_mut().find(|o| o.code() == code)
    }

    /// every option matching `code`, for multiplicity-n options like IA_NA
    pub fn get_all(&self, code: OptionCode) -> impl Iterator<Item = &DhcpOption> {
        self.0.iter().filter(move |o| o.code() == code)
    }

    /// remove and return the first option matching `code`
    pub fn remove(&mut self, code: OptionCode) -> Option<DhcpOption> {
        let idx = self.0.iter().position(|o| o.code() == code)?;
        Some(self.0.remove(idx))
    }

    /// remove every option matching `code`
    pub fn remove_all(&mut self, code: OptionCode) {
        self.0.retain(|o| o.code() != code);
    }

    /// append an option, without enforcing any multiplicity constraint —
    /// callers that need "replace if present" semantics for a multiplicity-1
    /// option should `remove` first (see `crate::pipeline`)
    pub fn push(&mut self, opt: DhcpOption) {
        self.0.push(opt);
    }

    /// iterate over options in wire order
    pub fn iter(&self) -> std::slice::Iter<'_, DhcpOption> {
        self.0.iter()
    }

    /// iterate mutably over options in wire order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DhcpOption> {
        self.0.iter_mut()
    }

    /// number of options in this set
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// whether this set has no options
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for DhcpOptions {
    type Item = DhcpOption;
    type IntoIter = std::vec::IntoIter<DhcpOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DhcpOptions {
    type Item = &'a DhcpOption;
    type IntoIter = std::slice::Iter<'a, DhcpOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<DhcpOption> for DhcpOptions {
    fn from_iter<I: IntoIterator<Item = DhcpOption>>(iter: I) -> Self {
        DhcpOptions(iter.into_iter().collect())
    }
}

impl Decodable for DhcpOptions {
    fn decode(decoder: &mut Decoder<'_>) -> DecodeResult<Self> {
        let mut opts = Vec::new();
        while !decoder.is_empty() {
            opts.push(DhcpOption::decode(decoder)?);
        }
        Ok(DhcpOptions(opts))
    }
}

impl Encodable for DhcpOptions {
    fn encode(&self, e: &mut Encoder<'_>) -> EncodeResult<()> {
        for opt in &self.0 {
            opt.encode(e)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duid::Duid;

    #[test]
    fn unknown_option_round_trips_verbatim() {
        let bytes = [0xfe, 0xed, 0, 3, 1, 2, 3];
        let decoded = DhcpOption::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(
            decoded,
            DhcpOption::Unknown(UnknownOption {
                code: 0xfeed,
                data: vec![1, 2, 3],
            })
        );
        assert_eq!(decoded.to_vec().unwrap(), bytes);
    }

    #[test]
    fn client_id_round_trips_through_generic_dispatch() {
        let opt = DhcpOption::ClientId(Duid::ethernet_ll([1, 2, 3, 4, 5, 6]));
        let bytes = opt.to_vec().unwrap();
        let decoded = DhcpOption::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(opt, decoded);
    }

    #[test]
    fn options_set_get_and_remove() {
        let mut opts = DhcpOptions::new();
        opts.push(DhcpOption::Preference(Preference(10)));
        opts.push(DhcpOption::ElapsedTime(ElapsedTime(0)));
        assert!(opts.get(OptionCode::Preference).is_some());
        let removed = opts.remove(OptionCode::Preference).unwrap();
        assert_eq!(removed, DhcpOption::Preference(Preference(10)));
        assert!(opts.get(OptionCode::Preference).is_none());
    }

    #[test]
    fn structurally_broken_known_option_downgrades_to_unknown() {
        // status-code (13) declares 1 byte but needs at least 2 for its
        // u16 status field -- a structural failure inside the value,
        // not an outer framing truncation, so it downgrades per §4.1
        // rather than failing the whole message.
        let bytes = [0, 13, 0, 1, 0xff];
        let mut decoder = Decoder::new(&bytes);
        let decoded = DhcpOption::decode(&mut decoder).unwrap();
        assert_eq!(
            decoded,
            DhcpOption::Unknown(UnknownOption {
                code: 13,
                data: vec![0xff],
            })
        );
        assert!(decoder.is_partially_decoded());
    }

    #[test]
    fn truncated_outer_framing_fails_decode_outright() {
        // ia-na (3) declares 40 bytes of value but only 20 are present --
        // the outer TLV framing itself is broken, so this is a hard
        // decode failure, never a downgrade.
        let mut bytes = vec![0, 3, 0, 40];
        bytes.extend(std::iter::repeat(0u8).take(20));
        let err = DhcpOption::decode(&mut Decoder::new(&bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::NotEnoughBytes));
    }

    #[test]
    fn nested_options_round_trip_through_ia_na() {
        let ia = DhcpOption::IaNa(IaNa {
            id: 7,
            t1: 100,
            t2: 200,
            opts: DhcpOptions(vec![DhcpOption::StatusCode(StatusCode::success())]),
        });
        let bytes = ia.to_vec().unwrap();
        let decoded = DhcpOption::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(ia, decoded);
    }
}

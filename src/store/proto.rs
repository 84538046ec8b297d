//! Protobuf encoding for the etcd KV messages this client sends and receives.
//!
//! The messages implement `prost::Message` by hand so no proto files or
//! build-time codegen are needed. Only the fields the record store reads or
//! writes are modelled; anything else on the wire is skipped while decoding.

use prost::encoding::{self, DecodeContext, WireType};
use prost::{DecodeError, Message};

/// gRPC method paths on the `etcdserverpb.KV` service.
pub const KV_RANGE: &str = "/etcdserverpb.KV/Range";
pub const KV_PUT: &str = "/etcdserverpb.KV/Put";
pub const KV_DELETE_RANGE: &str = "/etcdserverpb.KV/DeleteRange";

// ============================================================================
// ResponseHeader
// ============================================================================

/// etcdserverpb.ResponseHeader, revision only.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct ResponseHeader {
    pub revision: i64, // field 3
}

impl Message for ResponseHeader {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if self.revision != 0 {
            encoding::int64::encode(3, &self.revision, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            3 => encoding::int64::merge(wire_type, &mut self.revision, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        if self.revision != 0 {
            encoding::int64::encoded_len(3, &self.revision)
        } else {
            0
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// KeyValue
// ============================================================================

/// mvccpb.KeyValue without lease and create revision.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct KeyValue {
    pub key: Vec<u8>,      // field 1
    pub mod_revision: i64, // field 3
    pub version: i64,      // field 4
    pub value: Vec<u8>,    // field 5
}

impl Message for KeyValue {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if !self.key.is_empty() {
            encoding::bytes::encode(1, &self.key, buf);
        }
        if self.mod_revision != 0 {
            encoding::int64::encode(3, &self.mod_revision, buf);
        }
        if self.version != 0 {
            encoding::int64::encode(4, &self.version, buf);
        }
        if !self.value.is_empty() {
            encoding::bytes::encode(5, &self.value, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            3 => encoding::int64::merge(wire_type, &mut self.mod_revision, buf, ctx),
            4 => encoding::int64::merge(wire_type, &mut self.version, buf, ctx),
            5 => encoding::bytes::merge(wire_type, &mut self.value, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += encoding::bytes::encoded_len(1, &self.key);
        }
        if self.mod_revision != 0 {
            len += encoding::int64::encoded_len(3, &self.mod_revision);
        }
        if self.version != 0 {
            len += encoding::int64::encoded_len(4, &self.version);
        }
        if !self.value.is_empty() {
            len += encoding::bytes::encoded_len(5, &self.value);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// RangeRequest / RangeResponse
// ============================================================================

/// etcdserverpb.RangeRequest for single-key lookups.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct RangeRequest {
    pub key: Vec<u8>,       // field 1
    pub range_end: Vec<u8>, // field 2
    pub limit: i64,         // field 3
    pub serializable: bool, // field 7
}

impl RangeRequest {
    /// Linearizable lookup of exactly one key.
    pub fn single(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
            limit: 1,
            ..Default::default()
        }
    }
}

impl Message for RangeRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if !self.key.is_empty() {
            encoding::bytes::encode(1, &self.key, buf);
        }
        if !self.range_end.is_empty() {
            encoding::bytes::encode(2, &self.range_end, buf);
        }
        if self.limit != 0 {
            encoding::int64::encode(3, &self.limit, buf);
        }
        if self.serializable {
            encoding::bool::encode(7, &self.serializable, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            2 => encoding::bytes::merge(wire_type, &mut self.range_end, buf, ctx),
            3 => encoding::int64::merge(wire_type, &mut self.limit, buf, ctx),
            7 => encoding::bool::merge(wire_type, &mut self.serializable, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += encoding::bytes::encoded_len(1, &self.key);
        }
        if !self.range_end.is_empty() {
            len += encoding::bytes::encoded_len(2, &self.range_end);
        }
        if self.limit != 0 {
            len += encoding::int64::encoded_len(3, &self.limit);
        }
        if self.serializable {
            len += encoding::bool::encoded_len(7, &self.serializable);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// etcdserverpb.RangeResponse.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct RangeResponse {
    pub header: Option<ResponseHeader>, // field 1
    pub kvs: Vec<KeyValue>,             // field 2
    pub more: bool,                     // field 3
    pub count: i64,                     // field 4
}

impl RangeResponse {
    /// Value of the last returned pair, if any.
    pub fn into_value(self) -> Option<Vec<u8>> {
        self.kvs.into_iter().last().map(|kv| kv.value)
    }
}

impl Message for RangeResponse {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if let Some(ref header) = self.header {
            encoding::message::encode(1, header, buf);
        }
        for kv in &self.kvs {
            encoding::message::encode(2, kv, buf);
        }
        if self.more {
            encoding::bool::encode(3, &self.more, buf);
        }
        if self.count != 0 {
            encoding::int64::encode(4, &self.count, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => merge_header(&mut self.header, wire_type, buf, ctx),
            2 => {
                let mut kv = KeyValue::default();
                encoding::message::merge(wire_type, &mut kv, buf, ctx)?;
                self.kvs.push(kv);
                Ok(())
            }
            3 => encoding::bool::merge(wire_type, &mut self.more, buf, ctx),
            4 => encoding::int64::merge(wire_type, &mut self.count, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = header_len(&self.header);
        len += encoding::message::encoded_len_repeated(2, &self.kvs);
        if self.more {
            len += encoding::bool::encoded_len(3, &self.more);
        }
        if self.count != 0 {
            len += encoding::int64::encoded_len(4, &self.count);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// PutRequest / PutResponse
// ============================================================================

/// etcdserverpb.PutRequest without lease handling.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct PutRequest {
    pub key: Vec<u8>,   // field 1
    pub value: Vec<u8>, // field 2
    pub prev_kv: bool,  // field 4
}

impl Message for PutRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if !self.key.is_empty() {
            encoding::bytes::encode(1, &self.key, buf);
        }
        if !self.value.is_empty() {
            encoding::bytes::encode(2, &self.value, buf);
        }
        if self.prev_kv {
            encoding::bool::encode(4, &self.prev_kv, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            2 => encoding::bytes::merge(wire_type, &mut self.value, buf, ctx),
            4 => encoding::bool::merge(wire_type, &mut self.prev_kv, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += encoding::bytes::encoded_len(1, &self.key);
        }
        if !self.value.is_empty() {
            len += encoding::bytes::encoded_len(2, &self.value);
        }
        if self.prev_kv {
            len += encoding::bool::encoded_len(4, &self.prev_kv);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// etcdserverpb.PutResponse.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct PutResponse {
    pub header: Option<ResponseHeader>, // field 1
    pub prev_kv: Option<KeyValue>,      // field 2
}

impl Message for PutResponse {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if let Some(ref header) = self.header {
            encoding::message::encode(1, header, buf);
        }
        if let Some(ref prev_kv) = self.prev_kv {
            encoding::message::encode(2, prev_kv, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => merge_header(&mut self.header, wire_type, buf, ctx),
            2 => {
                let mut kv = self.prev_kv.take().unwrap_or_default();
                encoding::message::merge(wire_type, &mut kv, buf, ctx)?;
                self.prev_kv = Some(kv);
                Ok(())
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = header_len(&self.header);
        if let Some(ref prev_kv) = self.prev_kv {
            len += encoding::message::encoded_len(2, prev_kv);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// DeleteRangeRequest / DeleteRangeResponse
// ============================================================================

/// etcdserverpb.DeleteRangeRequest.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct DeleteRangeRequest {
    pub key: Vec<u8>,       // field 1
    pub range_end: Vec<u8>, // field 2
    pub prev_kv: bool,      // field 3
}

impl Message for DeleteRangeRequest {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if !self.key.is_empty() {
            encoding::bytes::encode(1, &self.key, buf);
        }
        if !self.range_end.is_empty() {
            encoding::bytes::encode(2, &self.range_end, buf);
        }
        if self.prev_kv {
            encoding::bool::encode(3, &self.prev_kv, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => encoding::bytes::merge(wire_type, &mut self.key, buf, ctx),
            2 => encoding::bytes::merge(wire_type, &mut self.range_end, buf, ctx),
            3 => encoding::bool::merge(wire_type, &mut self.prev_kv, buf, ctx),
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = 0;
        if !self.key.is_empty() {
            len += encoding::bytes::encoded_len(1, &self.key);
        }
        if !self.range_end.is_empty() {
            len += encoding::bytes::encoded_len(2, &self.range_end);
        }
        if self.prev_kv {
            len += encoding::bool::encoded_len(3, &self.prev_kv);
        }
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// etcdserverpb.DeleteRangeResponse.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct DeleteRangeResponse {
    pub header: Option<ResponseHeader>, // field 1
    pub deleted: i64,                   // field 2
    pub prev_kvs: Vec<KeyValue>,        // field 3
}

impl Message for DeleteRangeResponse {
    fn encode_raw(&self, buf: &mut impl prost::bytes::BufMut) {
        if let Some(ref header) = self.header {
            encoding::message::encode(1, header, buf);
        }
        if self.deleted != 0 {
            encoding::int64::encode(2, &self.deleted, buf);
        }
        for kv in &self.prev_kvs {
            encoding::message::encode(3, kv, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl prost::bytes::Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            1 => merge_header(&mut self.header, wire_type, buf, ctx),
            2 => encoding::int64::merge(wire_type, &mut self.deleted, buf, ctx),
            3 => {
                let mut kv = KeyValue::default();
                encoding::message::merge(wire_type, &mut kv, buf, ctx)?;
                self.prev_kvs.push(kv);
                Ok(())
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let mut len = header_len(&self.header);
        if self.deleted != 0 {
            len += encoding::int64::encoded_len(2, &self.deleted);
        }
        len += encoding::message::encoded_len_repeated(3, &self.prev_kvs);
        len
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

fn merge_header(
    slot: &mut Option<ResponseHeader>,
    wire_type: WireType,
    buf: &mut impl prost::bytes::Buf,
    ctx: DecodeContext,
) -> Result<(), DecodeError> {
    let mut header = slot.take().unwrap_or_default();
    encoding::message::merge(wire_type, &mut header, buf, ctx)?;
    *slot = Some(header);
    Ok(())
}

fn header_len(header: &Option<ResponseHeader>) -> usize {
    header
        .as_ref()
        .map(|h| encoding::message::encoded_len(1, h))
        .unwrap_or(0)
}

//! The production TLV wire format.

use crate::error::decode::{
    MalformedSnafu, MissingFieldSnafu, UnknownCriticalFieldSnafu, ValueOutOfRangeSnafu,
};
use crate::error::{DecodeError, EncodeError};
use crate::tlv::{self, TlvDecoder, TlvEncoder};
use crate::types::{
    Blob, Component, ContentType, ControlParameters, ControlResponse, Data, DelegationSet,
    Exclude, ExcludeEntry, ForwardingFlags, GenericSignature, Interest, KeyLocator, Link,
    LpPacket, MetaInfo, NackReason, Name, NetworkNack, Signature, SignatureParams, SignedBlob,
    ValidityPeriod,
};
use crate::wire::WireFormat;

/// The NDN packet format TLV codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct TlvWireFormat;

const FORMAT_NAME: &str = "tlv";

impl WireFormat for TlvWireFormat {
    fn name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn encode_name(&self, name: &Name) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        prepend_name(&mut encoder, name);
        Ok(encoder.finish())
    }

    fn decode_name(&self, input: &[u8]) -> Result<Name, DecodeError> {
        let mut decoder = TlvDecoder::new(input);
        let (name, ..) = decode_name(&mut decoder)?;
        decoder.finish()?;
        Ok(name)
    }

    fn encode_interest(&self, interest: &Interest) -> Result<SignedBlob, EncodeError> {
        let change_count = interest.change_count();
        if let Some(wire) = interest.wire_cache().get(FORMAT_NAME, change_count) {
            return Ok(wire);
        }
        let wire = encode_interest(interest)?;
        interest.wire_cache().set(FORMAT_NAME, change_count, wire.clone());
        Ok(wire)
    }

    fn decode_interest(&self, input: &[u8]) -> Result<Interest, DecodeError> {
        decode_interest(input)
    }

    fn encode_data(&self, data: &Data) -> Result<SignedBlob, EncodeError> {
        let change_count = data.change_count();
        if let Some(wire) = data.wire_cache().get(FORMAT_NAME, change_count) {
            return Ok(wire);
        }
        let wire = encode_data(data)?;
        data.wire_cache().set(FORMAT_NAME, change_count, wire.clone());
        Ok(wire)
    }

    fn decode_data(&self, input: &[u8]) -> Result<Data, DecodeError> {
        decode_data(input)
    }

    fn encode_control_parameters(
        &self,
        parameters: &ControlParameters,
    ) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        prepend_control_parameters(&mut encoder, parameters);
        Ok(encoder.finish())
    }

    fn decode_control_parameters(&self, input: &[u8]) -> Result<ControlParameters, DecodeError> {
        let mut decoder = TlvDecoder::new(input);
        let parameters = decode_control_parameters(&mut decoder)?;
        decoder.finish()?;
        Ok(parameters)
    }

    fn encode_control_response(&self, response: &ControlResponse) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        let start = encoder.len();
        if let Some(body) = response.body() {
            prepend_control_parameters(&mut encoder, body);
        }
        encoder.prepend_blob_tlv(tlv::STATUS_TEXT, response.status_text().as_bytes());
        encoder.prepend_nonneg_integer_tlv(tlv::STATUS_CODE, u64::from(response.status_code()));
        let length = encoder.len() - start;
        encoder.prepend_type_and_length(tlv::CONTROL_RESPONSE, length);
        Ok(encoder.finish())
    }

    fn decode_control_response(&self, input: &[u8]) -> Result<ControlResponse, DecodeError> {
        let mut decoder = TlvDecoder::new(input);
        let end = decoder.read_nested_tlvs_start(tlv::CONTROL_RESPONSE)?;
        let status_code = decoder.read_nonneg_integer_tlv(tlv::STATUS_CODE)?;
        let status_code =
            u32::try_from(status_code).map_err(|_| DecodeError::ValueOutOfRange {
                field: "ControlResponse status code",
            })?;
        let status_text = decoder.read_blob_tlv(tlv::STATUS_TEXT)?;
        let status_text = core::str::from_utf8(status_text)
            .map_err(|_| DecodeError::InvalidText { field: "ControlResponse status text" })?
            .to_string();
        let mut response = ControlResponse::new(status_code, status_text);
        if decoder.peek_type(tlv::CONTROL_PARAMETERS, end) {
            response.set_body(decode_control_parameters(&mut decoder)?);
        }
        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok(response)
    }

    fn encode_delegation_set(&self, set: &DelegationSet) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        prepend_delegation_set(&mut encoder, set);
        Ok(encoder.finish())
    }

    fn decode_delegation_set(&self, input: &[u8]) -> Result<DelegationSet, DecodeError> {
        let mut decoder = TlvDecoder::new(input);
        let set = decode_delegation_set(&mut decoder, input.len())?;
        decoder.finish()?;
        Ok(set)
    }

    fn encode_lp_packet(&self, packet: &LpPacket) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        let start = encoder.len();
        if !packet.fragment().is_empty() {
            encoder.prepend_blob_tlv(tlv::LP_FRAGMENT, packet.fragment());
        }
        if let Some(mark) = packet.congestion_mark() {
            encoder.prepend_nonneg_integer_tlv(tlv::LP_CONGESTION_MARK, mark);
        }
        if let Some(face_id) = packet.incoming_face_id() {
            encoder.prepend_nonneg_integer_tlv(tlv::LP_INCOMING_FACE_ID, face_id);
        }
        if let Some(nack) = packet.nack() {
            let nack_start = encoder.len();
            if nack.reason() != NackReason::None {
                encoder
                    .prepend_nonneg_integer_tlv(tlv::LP_NACK_REASON, u64::from(nack.reason().number()));
            }
            let length = encoder.len() - nack_start;
            encoder.prepend_type_and_length(tlv::LP_NACK, length);
        }
        let length = encoder.len() - start;
        encoder.prepend_type_and_length(tlv::LP_PACKET, length);
        Ok(encoder.finish())
    }

    fn decode_lp_packet(&self, input: &[u8]) -> Result<LpPacket, DecodeError> {
        let mut decoder = TlvDecoder::new(input);
        let end = decoder.read_nested_tlvs_start(tlv::LP_PACKET)?;
        let mut packet = LpPacket::new();
        while decoder.offset() < end {
            let (ty, value) = decoder.read_tlv()?;
            match ty {
                tlv::LP_FRAGMENT => {
                    packet.set_fragment(value.to_vec());
                }
                tlv::LP_NACK => {
                    let mut inner = TlvDecoder::new(value);
                    let reason = inner
                        .read_optional_nonneg_integer_tlv(tlv::LP_NACK_REASON, value.len())?
                        .map(|code| {
                            u32::try_from(code).map(NackReason::from_number).map_err(|_| {
                                ValueOutOfRangeSnafu { field: "Nack reason" }.build()
                            })
                        })
                        .transpose()?
                        .unwrap_or(NackReason::None);
                    packet.set_nack(NetworkNack::new(reason));
                }
                tlv::LP_INCOMING_FACE_ID => {
                    packet.set_incoming_face_id(tlv::decode_nonneg_integer(value)?);
                }
                tlv::LP_CONGESTION_MARK => {
                    packet.set_congestion_mark(tlv::decode_nonneg_integer(value)?);
                }
                ty if (tlv::LP_HEADER_IGNORE_MIN..=tlv::LP_HEADER_IGNORE_MAX).contains(&ty) => {
                    // Unrecognized but ignorable header.
                }
                ty => return UnknownCriticalFieldSnafu { ty }.fail(),
            }
        }
        decoder.finish_nested_tlvs(end)?;
        decoder.finish()?;
        Ok(packet)
    }

    fn encode_signature_info(&self, signature: &Signature) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        prepend_signature_info(&mut encoder, signature);
        Ok(encoder.finish())
    }

    fn encode_signature_value(&self, signature: &Signature) -> Result<Blob, EncodeError> {
        let mut encoder = TlvEncoder::new();
        encoder.prepend_blob_tlv(tlv::SIGNATURE_VALUE, signature.signature());
        Ok(encoder.finish())
    }

    fn decode_signature_info_and_value(
        &self,
        info: &[u8],
        value: &[u8],
    ) -> Result<Signature, DecodeError> {
        let mut decoder = TlvDecoder::new(info);
        let mut signature = decode_signature_info(&mut decoder)?;
        decoder.finish()?;
        let mut decoder = TlvDecoder::new(value);
        let bits = decoder.read_blob_tlv(tlv::SIGNATURE_VALUE)?;
        decoder.finish()?;
        signature.set_signature(bits.to_vec());
        Ok(signature)
    }
}

impl Link {
    /// Encodes the Link, refreshing the Data content from the delegation
    /// set first.
    pub fn wire_encode(&mut self, format: &dyn WireFormat) -> Result<SignedBlob, EncodeError> {
        let content = format.encode_delegation_set(self.delegations())?;
        self.data_mut().set_content(content);
        format.encode_data(self.data())
    }

    /// Decodes a Link: a Data whose content holds a delegation set.
    pub fn wire_decode(input: &[u8], format: &dyn WireFormat) -> Result<Link, DecodeError> {
        let data = format.decode_data(input)?;
        let delegations = format.decode_delegation_set(data.content())?;
        Ok(Link::from_parts(data, delegations))
    }
}

// ---- Names ----

/// Prepends the components of `name` without the Name header, reporting
/// `(after_last, after_all)` marks: the encoder lengths just after the final
/// component and after the first, for signed-portion arithmetic.
fn prepend_name_components(encoder: &mut TlvEncoder, name: &Name) -> (usize, usize) {
    let mut after_last = encoder.len();
    let last_index = name.len().wrapping_sub(1);
    for (index, component) in name.components().iter().enumerate().rev() {
        encoder.prepend_blob_tlv(component.type_code(), component.value());
        if index == last_index {
            after_last = encoder.len();
        }
    }
    (after_last, encoder.len())
}

fn prepend_name(encoder: &mut TlvEncoder, name: &Name) {
    let start = encoder.len();
    prepend_name_components(encoder, name);
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::NAME, length);
}

fn decode_component(ty: u64, value: &[u8]) -> Result<Component, DecodeError> {
    Component::new_typed(ty, value.to_vec())
        .map_err(|_| DecodeError::InvalidDigestComponent { length: value.len() })
}

/// Decodes a Name TLV, reporting the offsets of the start of the first
/// component and the start of the last (both equal to the value start for
/// an empty name).
fn decode_name(decoder: &mut TlvDecoder<'_>) -> Result<(Name, usize, usize), DecodeError> {
    let end = decoder.read_nested_tlvs_start(tlv::NAME)?;
    let value_start = decoder.offset();
    let mut first_component = value_start;
    let mut last_component = value_start;
    let mut name = Name::new();
    while decoder.offset() < end {
        let component_start = decoder.offset();
        if name.is_empty() {
            first_component = component_start;
        }
        last_component = component_start;
        let (ty, value) = decoder.read_tlv()?;
        name.append(decode_component(ty, value)?);
    }
    decoder.finish_nested_tlvs(end)?;
    Ok((name, first_component, last_component))
}

// ---- Key locators and signatures ----

fn prepend_key_locator(encoder: &mut TlvEncoder, ty: u64, key_locator: &KeyLocator) {
    let start = encoder.len();
    match key_locator {
        KeyLocator::None => {}
        KeyLocator::KeyName(name) => prepend_name(encoder, name),
        KeyLocator::KeyDigest(digest) => {
            encoder.prepend_blob_tlv(tlv::KEY_LOCATOR_DIGEST, digest)
        }
    }
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(ty, length);
}

fn decode_key_locator(
    decoder: &mut TlvDecoder<'_>,
    expected: u64,
) -> Result<KeyLocator, DecodeError> {
    let end = decoder.read_nested_tlvs_start(expected)?;
    let key_locator = if decoder.offset() == end {
        KeyLocator::None
    } else if decoder.peek_type(tlv::NAME, end) {
        let (name, ..) = decode_name(decoder)?;
        KeyLocator::KeyName(name)
    } else if decoder.peek_type(tlv::KEY_LOCATOR_DIGEST, end) {
        KeyLocator::KeyDigest(Blob::from_slice(decoder.read_blob_tlv(tlv::KEY_LOCATOR_DIGEST)?))
    } else {
        return MalformedSnafu {
            what: "KeyLocator",
            reason: "unrecognized child TLV".to_string(),
        }
        .fail();
    };
    decoder.finish_nested_tlvs(end)?;
    Ok(key_locator)
}

fn prepend_validity_period(encoder: &mut TlvEncoder, period: &ValidityPeriod) {
    let start = encoder.len();
    encoder.prepend_blob_tlv(
        tlv::NOT_AFTER,
        ValidityPeriod::to_iso_string(period.not_after()).as_bytes(),
    );
    // NotBefore precedes NotAfter on the wire, so it is prepended second.
    let not_before = ValidityPeriod::to_iso_string(period.not_before());
    encoder.prepend_blob_tlv(tlv::NOT_BEFORE, not_before.as_bytes());
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::VALIDITY_PERIOD, length);
}

fn decode_validity_period(decoder: &mut TlvDecoder<'_>) -> Result<ValidityPeriod, DecodeError> {
    let end = decoder.read_nested_tlvs_start(tlv::VALIDITY_PERIOD)?;
    let not_before = decoder.read_blob_tlv(tlv::NOT_BEFORE)?;
    let not_after = decoder.read_blob_tlv(tlv::NOT_AFTER)?;
    let parse = |bytes: &[u8]| -> Result<_, DecodeError> {
        let text = core::str::from_utf8(bytes)
            .map_err(|_| DecodeError::InvalidText { field: "ValidityPeriod timestamp" })?;
        ValidityPeriod::from_iso_string(text)
    };
    let period = ValidityPeriod::new(parse(not_before)?, parse(not_after)?);
    decoder.finish_nested_tlvs(end)?;
    Ok(period)
}

fn prepend_signature_info(encoder: &mut TlvEncoder, signature: &Signature) {
    if let Signature::Generic(generic) = signature {
        // The raw SignatureInfo TLV was kept at decode time; replay it.
        encoder.prepend_bytes(generic.info_wire());
        return;
    }
    let start = encoder.len();
    if let Some(params) = signature.params() {
        if let Some(period) = params.validity_period() {
            prepend_validity_period(encoder, period);
        }
        prepend_key_locator(encoder, tlv::KEY_LOCATOR, params.key_locator());
    }
    encoder.prepend_nonneg_integer_tlv(tlv::SIGNATURE_TYPE, signature.type_code());
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::SIGNATURE_INFO, length);
}

fn decode_signature_info(decoder: &mut TlvDecoder<'_>) -> Result<Signature, DecodeError> {
    let info_start = decoder.offset();
    let end = decoder.read_nested_tlvs_start(tlv::SIGNATURE_INFO)?;
    let signature_type = decoder.read_nonneg_integer_tlv(tlv::SIGNATURE_TYPE)?;
    let signature = match signature_type {
        Signature::TYPE_DIGEST_SHA256 => Signature::DigestSha256 { signature: Blob::default() },
        Signature::TYPE_SHA256_WITH_RSA
        | Signature::TYPE_SHA256_WITH_ECDSA
        | Signature::TYPE_HMAC_WITH_SHA256 => {
            let mut params = SignatureParams::default();
            if decoder.peek_type(tlv::KEY_LOCATOR, end) {
                params.set_key_locator(decode_key_locator(decoder, tlv::KEY_LOCATOR)?);
            }
            if decoder.peek_type(tlv::VALIDITY_PERIOD, end) {
                params.set_validity_period(decode_validity_period(decoder)?);
            }
            match signature_type {
                Signature::TYPE_SHA256_WITH_RSA => Signature::Sha256WithRsa(params),
                Signature::TYPE_SHA256_WITH_ECDSA => Signature::Sha256WithEcdsa(params),
                _ => Signature::HmacWithSha256(params),
            }
        }
        other => {
            // Keep the whole SignatureInfo TLV so the packet round-trips.
            let wire = decoder.bytes(info_start, end).to_vec();
            decoder.skip_to(end);
            Signature::Generic(GenericSignature::new(other, wire))
        }
    };
    // Skip fields this decoder does not model, e.g. future extensions.
    while decoder.offset() < end {
        decoder.skip_tlv()?;
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(signature)
}

// ---- Interest ----

fn prepend_exclude(encoder: &mut TlvEncoder, exclude: &Exclude) {
    let start = encoder.len();
    for entry in exclude.entries().iter().rev() {
        match entry {
            ExcludeEntry::Any => encoder.prepend_blob_tlv(tlv::ANY, &[]),
            ExcludeEntry::Component(component) => {
                encoder.prepend_blob_tlv(component.type_code(), component.value())
            }
        }
    }
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::EXCLUDE, length);
}

fn decode_exclude(decoder: &mut TlvDecoder<'_>) -> Result<Exclude, DecodeError> {
    let end = decoder.read_nested_tlvs_start(tlv::EXCLUDE)?;
    let mut exclude = Exclude::new();
    while decoder.offset() < end {
        let (ty, value) = decoder.read_tlv()?;
        if ty == tlv::ANY {
            exclude.append_any();
        } else {
            exclude.append_component(decode_component(ty, value)?);
        }
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(exclude)
}

fn prepend_selectors(encoder: &mut TlvEncoder, interest: &Interest) {
    let start = encoder.len();
    if interest.must_be_fresh() {
        encoder.prepend_blob_tlv(tlv::MUST_BE_FRESH, &[]);
    }
    if let Some(selector) = interest.child_selector() {
        encoder.prepend_nonneg_integer_tlv(tlv::CHILD_SELECTOR, u64::from(selector));
    }
    if !interest.exclude().is_empty() {
        prepend_exclude(encoder, interest.exclude());
    }
    if !interest.key_locator().is_none() {
        prepend_key_locator(
            encoder,
            tlv::PUBLISHER_PUBLIC_KEY_LOCATOR,
            interest.key_locator(),
        );
    }
    if let Some(max) = interest.max_suffix_components() {
        encoder.prepend_nonneg_integer_tlv(tlv::MAX_SUFFIX_COMPONENTS, u64::from(max));
    }
    if let Some(min) = interest.min_suffix_components() {
        encoder.prepend_nonneg_integer_tlv(tlv::MIN_SUFFIX_COMPONENTS, u64::from(min));
    }
    if encoder.len() != start {
        let length = encoder.len() - start;
        encoder.prepend_type_and_length(tlv::SELECTORS, length);
    }
}

fn encode_interest(interest: &Interest) -> Result<SignedBlob, EncodeError> {
    let mut encoder = TlvEncoder::new();
    if !interest.application_parameters().is_empty() {
        encoder.prepend_blob_tlv(tlv::APPLICATION_PARAMETERS, interest.application_parameters());
    }
    if let Some(hop_limit) = interest.hop_limit() {
        encoder.prepend_blob_tlv(tlv::HOP_LIMIT, &[hop_limit]);
    }
    if !interest.forwarding_hint().is_empty() {
        let start = encoder.len();
        prepend_delegation_set(&mut encoder, interest.forwarding_hint());
        let length = encoder.len() - start;
        encoder.prepend_type_and_length(tlv::FORWARDING_HINT, length);
    }
    if let Some(lifetime) = interest.interest_lifetime() {
        encoder.prepend_nonneg_integer_tlv(tlv::INTEREST_LIFETIME, lifetime);
    }
    let nonce = interest.nonce();
    let nonce_bytes: [u8; 4] = match <[u8; 4]>::try_from(nonce.as_ref()) {
        Ok(bytes) => bytes,
        // No usable nonce set: stamp fresh randomness into the encoding.
        Err(_) => rand::random(),
    };
    encoder.prepend_blob_tlv(tlv::NONCE, &nonce_bytes);
    prepend_selectors(&mut encoder, interest);
    let name_start = encoder.len();
    let (after_last, after_all) = prepend_name_components(&mut encoder, interest.name());
    let name_length = encoder.len() - name_start;
    encoder.prepend_type_and_length(tlv::NAME, name_length);
    let total_value = encoder.len();
    encoder.prepend_type_and_length(tlv::INTEREST, total_value);
    let total = encoder.len();
    Ok(SignedBlob::new(encoder.finish(), total - after_all, total - after_last))
}

fn decode_interest(input: &[u8]) -> Result<Interest, DecodeError> {
    let mut decoder = TlvDecoder::new(input);
    let end = decoder.read_nested_tlvs_start(tlv::INTEREST)?;
    let (name, signed_begin, signed_end) = decode_name(&mut decoder)?;
    let mut interest = Interest::new(name);
    interest.set_max_suffix_components(None::<u32>);
    interest.set_must_be_fresh(false);
    if decoder.peek_type(tlv::SELECTORS, end) {
        let selectors_end = decoder.read_nested_tlvs_start(tlv::SELECTORS)?;
        if let Some(min) =
            decoder.read_optional_nonneg_integer_tlv(tlv::MIN_SUFFIX_COMPONENTS, selectors_end)?
        {
            interest.set_min_suffix_components(narrow_u32(min, "MinSuffixComponents")?);
        }
        if let Some(max) =
            decoder.read_optional_nonneg_integer_tlv(tlv::MAX_SUFFIX_COMPONENTS, selectors_end)?
        {
            interest.set_max_suffix_components(narrow_u32(max, "MaxSuffixComponents")?);
        }
        if decoder.peek_type(tlv::PUBLISHER_PUBLIC_KEY_LOCATOR, selectors_end) {
            interest.set_key_locator(decode_key_locator(
                &mut decoder,
                tlv::PUBLISHER_PUBLIC_KEY_LOCATOR,
            )?);
        }
        if decoder.peek_type(tlv::EXCLUDE, selectors_end) {
            interest.set_exclude(decode_exclude(&mut decoder)?);
        }
        if let Some(selector) =
            decoder.read_optional_nonneg_integer_tlv(tlv::CHILD_SELECTOR, selectors_end)?
        {
            interest.set_child_selector(narrow_u32(selector, "ChildSelector")?);
        }
        if decoder.read_boolean_tlv(tlv::MUST_BE_FRESH, selectors_end)? {
            interest.set_must_be_fresh(true);
        }
        decoder.finish_nested_tlvs(selectors_end)?;
    }
    if decoder.peek_type(tlv::NONCE, end) {
        let nonce = decoder.read_blob_tlv(tlv::NONCE)?;
        interest.set_nonce(nonce.to_vec());
    }
    if let Some(lifetime) =
        decoder.read_optional_nonneg_integer_tlv(tlv::INTEREST_LIFETIME, end)?
    {
        interest.set_interest_lifetime(lifetime);
    }
    if decoder.peek_type(tlv::FORWARDING_HINT, end) {
        let hint_end = decoder.read_nested_tlvs_start(tlv::FORWARDING_HINT)?;
        let hint = decode_delegation_set(&mut decoder, hint_end)?;
        decoder.finish_nested_tlvs(hint_end)?;
        interest.set_forwarding_hint(hint);
    }
    if let Some(hop_limit) = decoder.read_optional_blob_tlv(tlv::HOP_LIMIT, end)? {
        if hop_limit.len() != 1 {
            return ValueOutOfRangeSnafu { field: "HopLimit" }.fail();
        }
        interest.set_hop_limit(hop_limit[0]);
    }
    if let Some(parameters) = decoder.read_optional_blob_tlv(tlv::APPLICATION_PARAMETERS, end)? {
        interest.set_application_parameters(parameters.to_vec());
    }
    decoder.finish_nested_tlvs(end)?;
    decoder.finish()?;
    let change_count = interest.change_count();
    interest.confirm_nonce();
    interest.wire_cache().set(
        FORMAT_NAME,
        change_count,
        SignedBlob::new(Blob::from_slice(input), signed_begin, signed_end),
    );
    Ok(interest)
}

// ---- Data ----

fn prepend_meta_info(encoder: &mut TlvEncoder, meta_info: &MetaInfo) {
    let start = encoder.len();
    if let Some(final_block_id) = meta_info.final_block_id() {
        let inner = encoder.len();
        encoder.prepend_blob_tlv(final_block_id.type_code(), final_block_id.value());
        let length = encoder.len() - inner;
        encoder.prepend_type_and_length(tlv::FINAL_BLOCK_ID, length);
    }
    if let Some(period) = meta_info.freshness_period() {
        encoder.prepend_nonneg_integer_tlv(tlv::FRESHNESS_PERIOD, period);
    }
    if meta_info.content_type() != ContentType::Blob {
        encoder.prepend_nonneg_integer_tlv(tlv::CONTENT_TYPE, meta_info.content_type().number());
    }
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::META_INFO, length);
}

fn decode_meta_info(decoder: &mut TlvDecoder<'_>) -> Result<MetaInfo, DecodeError> {
    let end = decoder.read_nested_tlvs_start(tlv::META_INFO)?;
    let mut meta_info = MetaInfo::new();
    if let Some(content_type) =
        decoder.read_optional_nonneg_integer_tlv(tlv::CONTENT_TYPE, end)?
    {
        meta_info.set_content_type(ContentType::from_number(content_type));
    }
    if let Some(period) = decoder.read_optional_nonneg_integer_tlv(tlv::FRESHNESS_PERIOD, end)? {
        meta_info.set_freshness_period(period);
    }
    if decoder.peek_type(tlv::FINAL_BLOCK_ID, end) {
        let final_block_end = decoder.read_nested_tlvs_start(tlv::FINAL_BLOCK_ID)?;
        let (ty, value) = decoder.read_tlv()?;
        meta_info.set_final_block_id(decode_component(ty, value)?);
        decoder.finish_nested_tlvs(final_block_end)?;
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(meta_info)
}

fn encode_data(data: &Data) -> Result<SignedBlob, EncodeError> {
    let mut encoder = TlvEncoder::new();
    encoder.prepend_blob_tlv(tlv::SIGNATURE_VALUE, data.signature().signature());
    let after_signed = encoder.len();
    prepend_signature_info(&mut encoder, data.signature());
    encoder.prepend_blob_tlv(tlv::CONTENT, data.content());
    prepend_meta_info(&mut encoder, data.meta_info());
    prepend_name(&mut encoder, data.name());
    let value_length = encoder.len();
    encoder.prepend_type_and_length(tlv::DATA, value_length);
    let total = encoder.len();
    Ok(SignedBlob::new(encoder.finish(), total - value_length, total - after_signed))
}

fn decode_data(input: &[u8]) -> Result<Data, DecodeError> {
    let mut decoder = TlvDecoder::new(input);
    let end = decoder.read_nested_tlvs_start(tlv::DATA)?;
    let signed_begin = decoder.offset();
    let (name, ..) = decode_name(&mut decoder)?;
    let mut data = Data::new(name);
    if decoder.peek_type(tlv::META_INFO, end) {
        data.set_meta_info(decode_meta_info(&mut decoder)?);
    }
    if let Some(content) = decoder.read_optional_blob_tlv(tlv::CONTENT, end)? {
        data.set_content(content.to_vec());
    }
    if !decoder.peek_type(tlv::SIGNATURE_INFO, end) {
        return MissingFieldSnafu { field: "SignatureInfo" }.fail();
    }
    let mut signature = decode_signature_info(&mut decoder)?;
    let signed_end = decoder.offset();
    let bits = decoder.read_blob_tlv(tlv::SIGNATURE_VALUE)?;
    signature.set_signature(bits.to_vec());
    data.set_signature(signature);
    decoder.finish_nested_tlvs(end)?;
    decoder.finish()?;
    let change_count = data.change_count();
    data.wire_cache().set(
        FORMAT_NAME,
        change_count,
        SignedBlob::new(Blob::from_slice(input), signed_begin, signed_end),
    );
    Ok(data)
}

// ---- Delegation sets ----

fn prepend_delegation_set(encoder: &mut TlvEncoder, set: &DelegationSet) {
    for delegation in set.delegations().iter().rev() {
        let start = encoder.len();
        prepend_name(encoder, delegation.name());
        encoder.prepend_nonneg_integer_tlv(tlv::LINK_PREFERENCE, delegation.preference() as u64);
        let length = encoder.len() - start;
        encoder.prepend_type_and_length(tlv::LINK_DELEGATION, length);
    }
}

fn decode_delegation_set(
    decoder: &mut TlvDecoder<'_>,
    end: usize,
) -> Result<DelegationSet, DecodeError> {
    let mut set = DelegationSet::new();
    while decoder.offset() < end {
        let delegation_end = decoder.read_nested_tlvs_start(tlv::LINK_DELEGATION)?;
        let preference = decoder.read_nonneg_integer_tlv(tlv::LINK_PREFERENCE)?;
        let preference = i32::try_from(preference)
            .map_err(|_| DecodeError::ValueOutOfRange { field: "Delegation preference" })?;
        let (name, ..) = decode_name(decoder)?;
        decoder.finish_nested_tlvs(delegation_end)?;
        set.add_unsorted(preference, name);
    }
    Ok(set)
}

// ---- NFD management ----

fn prepend_control_parameters(encoder: &mut TlvEncoder, parameters: &ControlParameters) {
    let start = encoder.len();
    if let Some(period) = parameters.expiration_period() {
        encoder.prepend_nonneg_integer_tlv(tlv::EXPIRATION_PERIOD, period);
    }
    if !parameters.strategy().is_empty() {
        let inner = encoder.len();
        prepend_name(encoder, parameters.strategy());
        let length = encoder.len() - inner;
        encoder.prepend_type_and_length(tlv::STRATEGY, length);
    }
    encoder.prepend_nonneg_integer_tlv(
        tlv::FLAGS,
        parameters.forwarding_flags().nfd_forwarding_flags(),
    );
    if let Some(cost) = parameters.cost() {
        encoder.prepend_nonneg_integer_tlv(tlv::COST, cost);
    }
    if let Some(origin) = parameters.origin() {
        encoder.prepend_nonneg_integer_tlv(tlv::ORIGIN, origin);
    }
    if let Some(feature) = parameters.local_control_feature() {
        encoder.prepend_nonneg_integer_tlv(tlv::LOCAL_CONTROL_FEATURE, feature);
    }
    if !parameters.uri().is_empty() {
        encoder.prepend_blob_tlv(tlv::URI, parameters.uri().as_bytes());
    }
    if let Some(face_id) = parameters.face_id() {
        encoder.prepend_nonneg_integer_tlv(tlv::FACE_ID, face_id);
    }
    if let Some(name) = parameters.name() {
        prepend_name(encoder, name);
    }
    let length = encoder.len() - start;
    encoder.prepend_type_and_length(tlv::CONTROL_PARAMETERS, length);
}

fn decode_control_parameters(
    decoder: &mut TlvDecoder<'_>,
) -> Result<ControlParameters, DecodeError> {
    let end = decoder.read_nested_tlvs_start(tlv::CONTROL_PARAMETERS)?;
    let mut parameters = ControlParameters::new();
    if decoder.peek_type(tlv::NAME, end) {
        let (name, ..) = decode_name(decoder)?;
        parameters.set_name(name);
    }
    if let Some(face_id) = decoder.read_optional_nonneg_integer_tlv(tlv::FACE_ID, end)? {
        parameters.set_face_id(face_id);
    }
    if let Some(uri) = decoder.read_optional_blob_tlv(tlv::URI, end)? {
        let uri = core::str::from_utf8(uri)
            .map_err(|_| DecodeError::InvalidText { field: "ControlParameters Uri" })?;
        parameters.set_uri(uri);
    }
    if let Some(feature) =
        decoder.read_optional_nonneg_integer_tlv(tlv::LOCAL_CONTROL_FEATURE, end)?
    {
        parameters.set_local_control_feature(feature);
    }
    if let Some(origin) = decoder.read_optional_nonneg_integer_tlv(tlv::ORIGIN, end)? {
        parameters.set_origin(origin);
    }
    if let Some(cost) = decoder.read_optional_nonneg_integer_tlv(tlv::COST, end)? {
        parameters.set_cost(cost);
    }
    if let Some(flags) = decoder.read_optional_nonneg_integer_tlv(tlv::FLAGS, end)? {
        parameters.set_forwarding_flags(ForwardingFlags::from_nfd_forwarding_flags(flags));
    }
    if decoder.peek_type(tlv::STRATEGY, end) {
        let strategy_end = decoder.read_nested_tlvs_start(tlv::STRATEGY)?;
        let (strategy, ..) = decode_name(decoder)?;
        parameters.set_strategy(strategy);
        decoder.finish_nested_tlvs(strategy_end)?;
    }
    if let Some(period) = decoder.read_optional_nonneg_integer_tlv(tlv::EXPIRATION_PERIOD, end)? {
        parameters.set_expiration_period(period);
    }
    decoder.finish_nested_tlvs(end)?;
    Ok(parameters)
}

fn narrow_u32(value: u64, field: &'static str) -> Result<u32, DecodeError> {
    u32::try_from(value).map_err(|_| DecodeError::ValueOutOfRange { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn empty_name_is_a_two_byte_tlv() {
        round_trip!(encode_name, decode_name, Name::new(), &[0x07, 0x00]);
    }

    #[test]
    fn name_round_trip() {
        round_trip!(
            encode_name,
            decode_name,
            name("/a/hi"),
            &[0x07, 0x07, 0x08, 0x01, b'a', 0x08, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn typed_component_round_trip() {
        let mut n = Name::new();
        n.append(Component::new_typed(42, b"x".to_vec()).unwrap());
        round_trip!(encode_name, decode_name, n, &[0x07, 0x03, 42, 0x01, b'x']);
    }

    #[test]
    fn truncated_name_is_rejected() {
        decode_error!(decode_name, &[0x07, 0x05, 0x08, 0x01]);
        decode_error!(decode_name, &[0x07]);
    }

    #[test]
    fn interest_round_trip_bit_exact() {
        let mut interest = Interest::new(name("/a"));
        interest.set_nonce(vec![1, 2, 3, 4]);
        interest.set_interest_lifetime(4000);
        round_trip!(
            encode_interest,
            decode_interest,
            interest,
            &[
                0x05, 0x13, // Interest
                0x07, 0x03, 0x08, 0x01, b'a', // Name
                0x09, 0x02, 0x12, 0x00, // Selectors { MustBeFresh }
                0x0A, 0x04, 1, 2, 3, 4, // Nonce
                0x0C, 0x02, 0x0F, 0xA0, // InterestLifetime = 4000
            ]
        );
    }

    #[test]
    fn interest_with_all_selectors_round_trips() {
        let mut interest = Interest::new(name("/prefix"));
        interest.set_min_suffix_components(1);
        interest.set_max_suffix_components(4);
        interest.set_key_locator(KeyLocator::KeyName(name("/key/name")));
        interest.exclude_mut().append_any();
        interest
            .exclude_mut()
            .append_component(Component::new(b"z".to_vec()));
        interest.set_child_selector(1);
        interest.set_must_be_fresh(false);
        interest.set_interest_lifetime(1000);
        interest.set_hop_limit(6);
        interest.forwarding_hint_mut().add(1, name("/zone"));
        interest.set_application_parameters(vec![0xC0, 0xC1]);

        let encoding = TlvWireFormat.encode_interest(&interest).unwrap();
        let decoded = TlvWireFormat.decode_interest(encoding.as_ref()).unwrap();
        assert_eq!(interest, decoded);
        // The nonce was stamped at encode time and survives the round trip.
        assert_eq!(4, decoded.nonce().len());
    }

    #[test]
    fn interest_signed_portion_spans_the_name_components() {
        let mut interest = Interest::new(name("/a/b"));
        interest.set_nonce(vec![9, 9, 9, 9]);
        let wire = TlvWireFormat.encode_interest(&interest).unwrap();
        // Offsets: outer header (2) + name header (2), components 'a' then
        // 'b', each three bytes.
        assert_eq!(4, wire.signed_begin());
        assert_eq!(7, wire.signed_end());
        assert_eq!(&[0x08, 0x01, b'a'], wire.signed_portion());
    }

    #[test]
    fn data_round_trip_and_signed_portion() {
        let mut data = Data::new(name("/d"));
        data.meta_info_mut().set_freshness_period(1000);
        data.set_content(b"hi".to_vec());
        data.set_signature(Signature::DigestSha256 { signature: Blob::from(vec![0xEE; 32]) });

        let wire = TlvWireFormat.encode_data(&data).unwrap();
        let decoded = TlvWireFormat.decode_data(wire.as_ref()).unwrap();
        assert_eq!(data, decoded);

        // Signed portion runs from the Name TLV through SignatureInfo.
        assert_eq!(2, wire.signed_begin());
        let signed = wire.signed_portion();
        assert!(signed.starts_with(&[0x07, 0x03, 0x08, 0x01, b'd']));
        assert!(signed.ends_with(&[0x16, 0x03, 0x1B, 0x01, 0x00]));
        // The SignatureValue TLV is everything after the signed portion.
        assert_eq!(&[0x17, 0x20], &wire.as_ref()[wire.signed_end()..wire.signed_end() + 2]);

        // The decoded packet reports the same signed portion without
        // re-encoding.
        let decoded_wire = TlvWireFormat.encode_data(&decoded).unwrap();
        assert_eq!(wire.signed_portion(), decoded_wire.signed_portion());
    }

    #[test]
    fn data_with_rsa_signature_and_validity_round_trips() {
        let mut data = Data::new(name("/certificate"));
        let mut params = SignatureParams::new(KeyLocator::KeyName(name("/key")));
        params.set_validity_period(ValidityPeriod::new(0, 86_400_000));
        params.set_signature(vec![7u8; 64]);
        data.set_signature(Signature::Sha256WithRsa(params));
        data.meta_info_mut().set_content_type(ContentType::Key);

        let wire = TlvWireFormat.encode_data(&data).unwrap();
        let decoded = TlvWireFormat.decode_data(wire.as_ref()).unwrap();
        assert_eq!(data, decoded);
        assert_eq!(
            Some(&ValidityPeriod::new(0, 86_400_000)),
            decoded.signature().validity_period()
        );
    }

    #[test]
    fn unknown_signature_type_round_trips_as_generic() {
        // SignatureInfo with type 200 and an unmodeled child TLV.
        let info = [0x16, 0x06, 0x1B, 0x01, 200, 0x81, 0x01, 0xFF];
        let value = [0x17, 0x02, 0xAB, 0xCD];
        let signature = TlvWireFormat
            .decode_signature_info_and_value(&info, &value)
            .unwrap();
        assert_eq!(200, signature.type_code());
        assert_eq!(&[0xAB, 0xCD], signature.signature().as_ref());
        let reencoded = TlvWireFormat.encode_signature_info(&signature).unwrap();
        assert_eq!(&info[..], reencoded.as_ref());
    }

    #[test]
    fn full_name_ends_with_the_encoding_digest() {
        use sha2::{Digest, Sha256};
        let mut data = Data::new(name("/d"));
        data.set_content(b"payload".to_vec());
        let full_name = data.full_name().unwrap();
        assert_eq!(data.name().len() + 1, full_name.len());
        let wire = data.wire_encode().unwrap();
        let digest: [u8; 32] = Sha256::digest(wire.as_ref()).into();
        assert_eq!(&digest[..], full_name.get(-1).unwrap().value().as_ref());
        // Stable across repeated calls.
        assert_eq!(full_name, data.full_name().unwrap());
        // Mutation invalidates both caches.
        data.set_content(b"other".to_vec());
        assert_ne!(full_name, data.full_name().unwrap());
    }

    #[test]
    fn delegation_set_and_link_round_trip() {
        let mut set = DelegationSet::new();
        set.add(2, name("/zone/b"));
        set.add(1, name("/zone/a"));
        let wire = TlvWireFormat.encode_delegation_set(&set).unwrap();
        let decoded = TlvWireFormat.decode_delegation_set(wire.as_ref()).unwrap();
        assert_eq!(set, decoded);

        let mut link = Link::new(name("/link"));
        link.add_delegation(1, name("/zone/a"));
        link.add_delegation(2, name("/zone/b"));
        let wire = link.wire_encode(&TlvWireFormat).unwrap();
        let decoded = Link::wire_decode(wire.as_ref(), &TlvWireFormat).unwrap();
        assert_eq!(ContentType::Link, decoded.data().meta_info().content_type());
        assert_eq!(link.delegations(), decoded.delegations());
    }

    #[test]
    fn control_parameters_round_trip() {
        let mut parameters = ControlParameters::new();
        parameters.set_name(name("/app/prefix"));
        parameters.set_face_id(12);
        parameters.set_uri("tcp4://127.0.0.1:6363");
        parameters.set_origin(128);
        parameters.set_cost(10);
        parameters.set_expiration_period(60_000);
        let mut flags = ForwardingFlags::new();
        flags.set_capture(true);
        parameters.set_forwarding_flags(flags);

        let wire = TlvWireFormat.encode_control_parameters(&parameters).unwrap();
        let decoded = TlvWireFormat.decode_control_parameters(wire.as_ref()).unwrap();
        assert_eq!(parameters, decoded);
        assert_eq!(3, decoded.forwarding_flags().nfd_forwarding_flags());
    }

    #[test]
    fn control_response_round_trip() {
        let mut response = ControlResponse::new(200, "OK");
        let mut body = ControlParameters::new();
        body.set_name(name("/app/prefix"));
        response.set_body(body);
        let wire = TlvWireFormat.encode_control_response(&response).unwrap();
        let decoded = TlvWireFormat.decode_control_response(wire.as_ref()).unwrap();
        assert_eq!(response, decoded);
    }

    #[test]
    fn lp_packet_round_trip_with_nack() {
        let inner = TlvWireFormat
            .encode_interest(&Interest::new(name("/nacked")))
            .unwrap();
        let mut packet = LpPacket::new();
        packet.set_fragment(inner.as_ref().to_vec());
        packet.set_nack(NetworkNack::new(NackReason::NoRoute));
        packet.set_incoming_face_id(7);
        packet.set_congestion_mark(1);

        let wire = TlvWireFormat.encode_lp_packet(&packet).unwrap();
        let decoded = TlvWireFormat.decode_lp_packet(wire.as_ref()).unwrap();
        assert_eq!(packet, decoded);
        assert_eq!(NackReason::NoRoute, decoded.nack().unwrap().reason());
    }

    #[test]
    fn lp_packet_skips_ignorable_headers_only() {
        // CachePolicy (820) is unrecognized but ignorable.
        let wire = [100, 5, 0xFD, 0x03, 0x34, 0x01, 0x00];
        assert!(TlvWireFormat.decode_lp_packet(&wire).is_ok());
        // Type 90 is outside the ignore range.
        let wire = [100, 3, 90, 1, 0];
        assert!(matches!(
            TlvWireFormat.decode_lp_packet(&wire),
            Err(DecodeError::UnknownCriticalField { ty: 90 })
        ));
    }

    #[test]
    fn mutating_a_nested_field_invalidates_the_cached_encoding() {
        let mut data = Data::new(name("/a"));
        let first = TlvWireFormat.encode_data(&data).unwrap();
        let again = TlvWireFormat.encode_data(&data).unwrap();
        assert_eq!(first.as_ref(), again.as_ref());
        data.name_mut().append_str("b");
        let changed = TlvWireFormat.encode_data(&data).unwrap();
        assert_ne!(first.as_ref(), changed.as_ref());
    }

    #[test]
    fn oversized_interest_length_is_rejected_on_decode() {
        decode_error!(decode_interest, &[0x05, 0x50, 0x07, 0x00]);
    }
}

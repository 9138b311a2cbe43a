//! # `rteletext`
//! Welcome to `rteletext` ! This crate decodes EBU Teletext subtitles carried in DVB streams into timed UTF-8 text.
//!
//! Teletext is one of those old standards that refuses to die : plenty of European broadcasters still
//! send their subtitles this way (the famous page 888), and the relevant specs ([EN 300 706](https://www.etsi.org/deliver/etsi_en/300700_300799/300706/01.02.01_60/en_300706v010201p.pdf),
//! [EN 300 472](https://www.etsi.org/deliver/etsi_en/300400_300499/300472/01.03.01_60/en_300472v010301p.pdf))
//! assume a lot of 1970s context that nobody has anymore. So here is the short version of how it all fits together.
//!
//! A Teletext service is organised in 8 magazines of pages. Pages are sent as a header packet
//! followed by up to 23 text row packets, 40 characters each, and the whole thing repeats forever,
//! either one page at a time (serial mode) or with magazines interleaved (parallel mode).
//! Subtitles are just ordinary pages whose text sits inside "boxed" areas.
//! On top of the basic rows there are enhancement packets : X/26 overlays accented and special
//! characters onto the page, X/28 and M/29 switch the character set, because 40 year old bandwidth
//! constraints meant national variants share the same 7-bit codes.
//!
//! Inside a DVB multiplex, all of that is wrapped into PES packets on their own PID
//! (the PMT points to them with a teletext descriptor). Each PES payload carries data units of
//! 44 bytes : 2 address bytes and 40 data bytes, all transmitted least significant bit first and
//! protected by a mix of odd parity, Hamming 8/4 and Hamming 24/18.
//!
//! To use this crate, feed the PES payloads of a Teletext PID to a
//! [TeletextDecoder](decoder::TeletextDecoder) together with their PTS converted to milliseconds.
//! The decoder reassembles the pages, deals with all the error correction and charset business,
//! and hands completed subtitles to your sink as [TextSample](sample::TextSample)s.
//! Getting the PES payloads out of a Transport Stream is out of scope here, any demultiplexer will do.

pub mod charset;
pub mod decoder;
pub mod error;
pub mod hamming;
pub mod page;
pub mod pes;
pub mod sample;
pub mod utils;

use crate::cartridge::Cartridge;
use crate::interrupt::NmiSignal;
use crate::{NES_HEIGHT, NES_WIDTH};

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const POST_RENDER_SCANLINE: u16 = 240;
pub const VBLANK_START_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;
/// Dot on which vblank is set (scanline 241) and cleared (pre-render line).
pub const VBLANK_SET_RESET_DOT: u16 = 1;

// PPUCTRL ($2000)
const CTRL_NAMETABLE: u8 = 0x03;
const CTRL_INCREMENT_32: u8 = 0x04;
const CTRL_SPRITE_TABLE: u8 = 0x08;
const CTRL_BACKGROUND_TABLE: u8 = 0x10;
const CTRL_SPRITE_8X16: u8 = 0x20;
const CTRL_NMI: u8 = 0x80;

// PPUMASK ($2001)
const MASK_GREYSCALE: u8 = 0x01;
const MASK_BACKGROUND_LEFT: u8 = 0x02;
const MASK_SPRITES_LEFT: u8 = 0x04;
const MASK_BACKGROUND: u8 = 0x08;
const MASK_SPRITES: u8 = 0x10;

// PPUSTATUS ($2002)
pub const STATUS_SPRITE_OVERFLOW: u8 = 0x20;
pub const STATUS_SPRITE_ZERO_HIT: u8 = 0x40;
pub const STATUS_VBLANK: u8 = 0x80;

/// Internal 15-bit VRAM address ("loopy" v/t register).
///
/// ```text
/// yyy NN YYYYY XXXXX
/// ||| || ||||| +++++-- coarse X scroll
/// ||| || +++++-------- coarse Y scroll
/// ||| ++-------------- nametable select
/// +++----------------- fine Y scroll
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VramAddress(u16);

impl VramAddress {
    pub fn new(raw: u16) -> Self {
        Self(raw & 0x7FFF)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn coarse_x(self) -> u8 {
        (self.0 & 0x001F) as u8
    }

    pub fn coarse_y(self) -> u8 {
        ((self.0 >> 5) & 0x1F) as u8
    }

    pub fn nametable(self) -> u8 {
        ((self.0 >> 10) & 0x03) as u8
    }

    pub fn fine_y(self) -> u8 {
        ((self.0 >> 12) & 0x07) as u8
    }

    pub fn set_coarse_x(&mut self, value: u8) {
        self.0 = (self.0 & !0x001F) | (value as u16 & 0x1F);
    }

    pub fn set_coarse_y(&mut self, value: u8) {
        self.0 = (self.0 & !0x03E0) | ((value as u16 & 0x1F) << 5);
    }

    pub fn set_nametable(&mut self, value: u8) {
        self.0 = (self.0 & !0x0C00) | ((value as u16 & 0x03) << 10);
    }

    pub fn set_fine_y(&mut self, value: u8) {
        self.0 = (self.0 & !0x7000) | ((value as u16 & 0x07) << 12);
    }

    /// First PPUADDR write. Bit 14 is cleared along with the top two bits.
    fn set_high_byte(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16 & 0x3F) << 8);
    }

    fn set_low_byte(&mut self, value: u8) {
        self.0 = (self.0 & 0x7F00) | value as u16;
    }

    fn increment(&mut self, by: u16) {
        self.0 = self.0.wrapping_add(by) & 0x7FFF;
    }

    fn increment_coarse_x(&mut self) {
        if self.coarse_x() == 31 {
            self.set_coarse_x(0);
            self.0 ^= 0x0400;
        } else {
            self.0 += 1;
        }
    }

    fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
            return;
        }
        self.set_fine_y(0);
        match self.coarse_y() {
            29 => {
                self.set_coarse_y(0);
                self.0 ^= 0x0800;
            }
            // Rows 30 and 31 are attribute memory; wrap without switching
            31 => self.set_coarse_y(0),
            y => self.set_coarse_y(y + 1),
        }
    }

    fn copy_horizontal(&mut self, from: VramAddress) {
        self.0 = (self.0 & !0x041F) | (from.0 & 0x041F);
    }

    fn copy_vertical(&mut self, from: VramAddress) {
        self.0 = (self.0 & !0x7BE0) | (from.0 & 0x7BE0);
    }

    fn tile_address(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    fn attribute_address(self) -> u16 {
        0x23C0 | (self.0 & 0x0C00) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }
}

/// Maps a palette address to an index into the 32-byte palette RAM.
///
/// $3F10/$3F14/$3F18/$3F1C are the sprite backdrop slots and mirror
/// $3F00/$3F04/$3F08/$3F0C.
pub fn palette_index(addr: u16) -> usize {
    let index = (addr & 0x1F) as usize;
    if index >= 0x10 && index & 0x03 == 0 {
        index & 0x0F
    } else {
        index
    }
}

#[derive(Debug, Clone)]
pub struct Ppu {
    // Registers
    pub ctrl: u8,     // PPUCTRL (0x2000)
    pub mask: u8,     // PPUMASK (0x2001)
    pub status: u8,   // PPUSTATUS (0x2002)
    pub oam_addr: u8, // OAMADDR (0x2003)

    // Memory
    pub vram: [u8; 0x800],
    pub palette: [u8; 0x20],
    pub oam: [u8; 0x100],
    secondary_oam: [u8; 0x20],

    // Scroll/address state (v, t, x, w)
    pub v: VramAddress,
    pub t: VramAddress,
    pub fine_x: u8,
    pub write_toggle: bool,

    io_latch: u8,
    read_buffer: u8,

    scanline: u16,
    dot: u16,
    frame: u64,
    suppress_vblank: bool,

    // Background pipeline
    next_tile_id: u8,
    next_tile_attr: u8,
    next_tile_low: u8,
    next_tile_high: u8,
    shift_pattern_low: u16,
    shift_pattern_high: u16,
    shift_attr_low: u16,
    shift_attr_high: u16,

    // Sprites found by evaluation, fetched at 257-320 for the next line
    eval_count: u8,
    eval_has_sprite_zero: bool,
    sprite_count: u8,
    sprite_zero_in_line: bool,
    sprite_patterns_low: [u8; 8],
    sprite_patterns_high: [u8; 8],
    sprite_positions: [u8; 8],
    sprite_attributes: [u8; 8],

    /// 6-bit palette indices, one per pixel.
    pub framebuffer: Vec<u8>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: 0,
            mask: 0,
            status: 0,
            oam_addr: 0,
            vram: [0; 0x800],
            palette: [0; 0x20],
            oam: [0; 0x100],
            secondary_oam: [0xFF; 0x20],
            v: VramAddress::default(),
            t: VramAddress::default(),
            fine_x: 0,
            write_toggle: false,
            io_latch: 0,
            read_buffer: 0,
            scanline: 0,
            dot: 0,
            frame: 0,
            suppress_vblank: false,
            next_tile_id: 0,
            next_tile_attr: 0,
            next_tile_low: 0,
            next_tile_high: 0,
            shift_pattern_low: 0,
            shift_pattern_high: 0,
            shift_attr_low: 0,
            shift_attr_high: 0,
            eval_count: 0,
            eval_has_sprite_zero: false,
            sprite_count: 0,
            sprite_zero_in_line: false,
            sprite_patterns_low: [0; 8],
            sprite_patterns_high: [0; 8],
            sprite_positions: [0; 8],
            sprite_attributes: [0; 8],
            framebuffer: vec![0; NES_WIDTH * NES_HEIGHT],
        }
    }

    /// Reset button: clears the write-only registers and the write toggle.
    /// Counters, OAM and VRAM keep running/untouched.
    pub fn reset(&mut self) {
        self.ctrl = 0;
        self.mask = 0;
        self.write_toggle = false;
        self.t = VramAddress::default();
        self.fine_x = 0;
        self.read_buffer = 0;
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn data_bus_latch(&self) -> u8 {
        self.io_latch
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask & (MASK_BACKGROUND | MASK_SPRITES) != 0
    }

    pub fn in_vblank(&self) -> bool {
        (VBLANK_START_SCANLINE..PRE_RENDER_SCANLINE).contains(&self.scanline)
    }

    fn on_render_line(&self) -> bool {
        self.scanline < POST_RENDER_SCANLINE || self.scanline == PRE_RENDER_SCANLINE
    }

    fn rendering_active(&self) -> bool {
        self.rendering_enabled() && self.on_render_line()
    }

    /// Advances one dot and performs the work scheduled for it.
    pub fn tick(&mut self, cart: &mut dyn Cartridge, nmi: &mut NmiSignal) {
        self.advance_counters();

        if self.scanline == VBLANK_START_SCANLINE && self.dot == VBLANK_SET_RESET_DOT {
            if self.suppress_vblank {
                self.suppress_vblank = false;
            } else {
                self.status |= STATUS_VBLANK;
                if self.ctrl & CTRL_NMI != 0 {
                    nmi.raise();
                }
            }
        }

        if self.scanline == PRE_RENDER_SCANLINE && self.dot == VBLANK_SET_RESET_DOT {
            self.status &= !(STATUS_VBLANK | STATUS_SPRITE_ZERO_HIT | STATUS_SPRITE_OVERFLOW);
        }

        if !self.on_render_line() {
            return;
        }

        if self.rendering_enabled() {
            self.fetch_background(cart);
            self.process_sprites(cart);
        }

        if self.scanline < POST_RENDER_SCANLINE && (1..=256).contains(&self.dot) {
            let x = self.dot - 1;
            let color = if self.rendering_enabled() {
                self.compose_pixel(x)
            } else {
                self.backdrop_color()
            };
            let color = if self.mask & MASK_GREYSCALE != 0 {
                color & 0x30
            } else {
                color & 0x3F
            };
            self.framebuffer[self.scanline as usize * NES_WIDTH + x as usize] = color;
        }
    }

    fn advance_counters(&mut self) {
        self.dot += 1;

        // The pre-render line is one dot shorter on odd frames while rendering
        if self.scanline == PRE_RENDER_SCANLINE
            && self.dot == DOTS_PER_SCANLINE - 1
            && self.frame % 2 == 1
            && self.rendering_enabled()
        {
            self.dot += 1;
        }

        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame += 1;
            }
        }
    }

    fn fetch_background(&mut self, cart: &mut dyn Cartridge) {
        let dot = self.dot;

        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.shift_background();
            if (dot - 1) % 8 == 0 {
                self.reload_background_shifters();
            }
        }

        if (1..=256).contains(&dot) || (321..=336).contains(&dot) {
            match (dot - 1) % 8 {
                1 => self.next_tile_id = self.read_memory(self.v.tile_address(), cart),
                3 => {
                    let attr = self.read_memory(self.v.attribute_address(), cart);
                    let shift = ((self.v.coarse_y() & 0x02) << 1) | (self.v.coarse_x() & 0x02);
                    self.next_tile_attr = (attr >> shift) & 0x03;
                }
                5 => {
                    let addr = self.background_pattern_address();
                    self.next_tile_low = self.read_memory(addr, cart);
                }
                7 => {
                    let addr = self.background_pattern_address() | 0x08;
                    self.next_tile_high = self.read_memory(addr, cart);
                    self.v.increment_coarse_x();
                }
                _ => {}
            }
        }

        match dot {
            256 => self.v.increment_y(),
            257 => self.v.copy_horizontal(self.t),
            // Unused nametable fetches; mappers watching the bus still see them
            338 | 340 => {
                self.read_memory(self.v.tile_address(), cart);
            }
            _ => {}
        }

        if self.scanline == PRE_RENDER_SCANLINE && (280..=304).contains(&dot) {
            self.v.copy_vertical(self.t);
        }
    }

    fn background_pattern_address(&self) -> u16 {
        let table = if self.ctrl & CTRL_BACKGROUND_TABLE != 0 { 0x1000 } else { 0x0000 };
        table | ((self.next_tile_id as u16) << 4) | self.v.fine_y() as u16
    }

    fn shift_background(&mut self) {
        self.shift_pattern_low <<= 1;
        self.shift_pattern_high <<= 1;
        self.shift_attr_low <<= 1;
        self.shift_attr_high <<= 1;
    }

    fn reload_background_shifters(&mut self) {
        self.shift_pattern_low = (self.shift_pattern_low & 0xFF00) | self.next_tile_low as u16;
        self.shift_pattern_high = (self.shift_pattern_high & 0xFF00) | self.next_tile_high as u16;
        let attr_low = if self.next_tile_attr & 0x01 != 0 { 0xFF } else { 0x00 };
        let attr_high = if self.next_tile_attr & 0x02 != 0 { 0xFF } else { 0x00 };
        self.shift_attr_low = (self.shift_attr_low & 0xFF00) | attr_low;
        self.shift_attr_high = (self.shift_attr_high & 0xFF00) | attr_high;
    }

    /// Secondary OAM clear (1-64), evaluation (65) and pattern fetches
    /// (257-320) for the following scanline.
    fn process_sprites(&mut self, cart: &mut dyn Cartridge) {
        let dot = self.dot;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;

        if !pre_render && (1..=64).contains(&dot) && dot % 2 == 0 {
            self.secondary_oam[(dot / 2 - 1) as usize] = 0xFF;
        }

        if !pre_render && dot == 65 {
            self.evaluate_sprites();
        }

        if (257..=320).contains(&dot) {
            self.oam_addr = 0;
            if dot == 257 {
                // Nothing is evaluated on the pre-render line, so line 0
                // never shows sprites
                if pre_render {
                    self.eval_count = 0;
                    self.eval_has_sprite_zero = false;
                }
                self.sprite_count = self.eval_count;
                self.sprite_zero_in_line = self.eval_has_sprite_zero;
            }
            let slot = ((dot - 257) / 8) as usize;
            match (dot - 257) % 8 {
                5 => self.fetch_sprite_pattern(slot, false, cart),
                7 => self.fetch_sprite_pattern(slot, true, cart),
                _ => {}
            }
        }
    }

    fn sprite_height(&self) -> u16 {
        if self.ctrl & CTRL_SPRITE_8X16 != 0 {
            16
        } else {
            8
        }
    }

    fn evaluate_sprites(&mut self) {
        let height = self.sprite_height();
        self.eval_count = 0;
        self.eval_has_sprite_zero = false;

        for n in 0..64 {
            let y = self.oam[n * 4] as u16;
            let row = self.scanline.wrapping_sub(y);
            if row >= height {
                continue;
            }
            if self.eval_count == 8 {
                self.status |= STATUS_SPRITE_OVERFLOW;
                break;
            }
            let dst = self.eval_count as usize * 4;
            self.secondary_oam[dst..dst + 4].copy_from_slice(&self.oam[n * 4..n * 4 + 4]);
            if n == 0 {
                self.eval_has_sprite_zero = true;
            }
            self.eval_count += 1;
        }
    }

    fn fetch_sprite_pattern(&mut self, slot: usize, high: bool, cart: &mut dyn Cartridge) {
        let in_use = slot < self.sprite_count as usize;
        // Empty slots still fetch tile $FF
        let (y, tile, attr, x) = if in_use {
            let s = &self.secondary_oam[slot * 4..slot * 4 + 4];
            (s[0], s[1], s[2], s[3])
        } else {
            (0xFF, 0xFF, 0xFF, 0xFF)
        };

        let row = self.scanline.wrapping_sub(y as u16);
        let addr = self.sprite_pattern_address(tile, attr, row) | if high { 0x08 } else { 0x00 };
        let mut pattern = self.read_memory(addr, cart);
        if !in_use {
            pattern = 0;
        } else if attr & 0x40 != 0 {
            pattern = pattern.reverse_bits();
        }

        if high {
            self.sprite_patterns_high[slot] = pattern;
            self.sprite_positions[slot] = x;
            self.sprite_attributes[slot] = attr;
        } else {
            self.sprite_patterns_low[slot] = pattern;
        }
    }

    fn sprite_pattern_address(&self, tile: u8, attr: u8, row: u16) -> u16 {
        let flip_vertical = attr & 0x80 != 0;
        if self.ctrl & CTRL_SPRITE_8X16 != 0 {
            let mut row = row & 0x0F;
            if flip_vertical {
                row = 15 - row;
            }
            let table = (tile as u16 & 0x01) << 12;
            let index = (tile as u16 & 0xFE) + (row >> 3);
            table | (index << 4) | (row & 0x07)
        } else {
            let mut row = row & 0x07;
            if flip_vertical {
                row = 7 - row;
            }
            let table = if self.ctrl & CTRL_SPRITE_TABLE != 0 { 0x1000 } else { 0x0000 };
            table | ((tile as u16) << 4) | row
        }
    }

    fn background_pixel(&self, x: u16) -> (u8, u8) {
        if self.mask & MASK_BACKGROUND == 0 || (x < 8 && self.mask & MASK_BACKGROUND_LEFT == 0) {
            return (0, 0);
        }
        let bit = 0x8000 >> self.fine_x;
        let pixel = (((self.shift_pattern_high & bit) != 0) as u8) << 1
            | ((self.shift_pattern_low & bit) != 0) as u8;
        let palette = (((self.shift_attr_high & bit) != 0) as u8) << 1
            | ((self.shift_attr_low & bit) != 0) as u8;
        (pixel, palette)
    }

    /// First opaque sprite pixel at `x`: (slot, pixel value, attributes).
    fn sprite_pixel(&self, x: u16) -> Option<(usize, u8, u8)> {
        if self.mask & MASK_SPRITES == 0 || (x < 8 && self.mask & MASK_SPRITES_LEFT == 0) {
            return None;
        }
        (0..self.sprite_count as usize).find_map(|i| {
            let offset = x.wrapping_sub(self.sprite_positions[i] as u16);
            if offset >= 8 {
                return None;
            }
            let shift = 7 - offset;
            let pixel = ((self.sprite_patterns_high[i] >> shift) & 0x01) << 1
                | ((self.sprite_patterns_low[i] >> shift) & 0x01);
            (pixel != 0).then_some((i, pixel, self.sprite_attributes[i]))
        })
    }

    fn compose_pixel(&mut self, x: u16) -> u8 {
        let (bg_pixel, bg_palette) = self.background_pixel(x);
        let background = if bg_pixel != 0 { (bg_palette << 2) | bg_pixel } else { 0 };

        let index = match self.sprite_pixel(x) {
            Some((slot, pixel, attr)) => {
                if slot == 0 && self.sprite_zero_in_line && bg_pixel != 0 && x != 255 {
                    self.status |= STATUS_SPRITE_ZERO_HIT;
                }
                let behind_background = attr & 0x20 != 0;
                if bg_pixel == 0 || !behind_background {
                    0x10 | ((attr & 0x03) << 2) | pixel
                } else {
                    background
                }
            }
            None => background,
        };
        self.palette[palette_index(index as u16)]
    }

    /// Universal background color shown while rendering is off. If `v` points
    /// into palette memory, that entry is shown instead.
    fn backdrop_color(&self) -> u8 {
        let addr = self.v.raw() & 0x3FFF;
        if addr >= 0x3F00 {
            self.palette[palette_index(addr)]
        } else {
            self.palette[0]
        }
    }

    fn increment_data_address(&mut self) {
        if self.rendering_active() {
            // Data port access mid-render clocks both scroll counters instead
            self.v.increment_coarse_x();
            self.v.increment_y();
        } else {
            let step = if self.ctrl & CTRL_INCREMENT_32 != 0 { 32 } else { 1 };
            self.v.increment(step);
        }
    }

    pub fn cpu_read(&mut self, addr: u16, cart: &mut dyn Cartridge) -> u8 {
        match addr & 0x0007 {
            2 => {
                self.io_latch = (self.status & 0xE0) | (self.io_latch & 0x1F);
                self.status &= !STATUS_VBLANK;
                self.write_toggle = false;
                // Reading one dot before the flag goes up loses it for the frame
                if self.scanline == VBLANK_START_SCANLINE && self.dot == VBLANK_SET_RESET_DOT - 1 {
                    self.suppress_vblank = true;
                }
            }
            4 => {
                let mut value = self.oam[self.oam_addr as usize];
                if self.oam_addr & 0x03 == 0x02 {
                    // Attribute bits 2-4 are not implemented in OAM
                    value &= 0xE3;
                }
                self.io_latch = value;
            }
            7 => {
                let addr = self.v.raw() & 0x3FFF;
                self.io_latch = if addr >= 0x3F00 {
                    let color = (self.read_memory(addr, cart) & 0x3F) | (self.io_latch & 0xC0);
                    // The buffer picks up the nametable byte "under" the palette
                    self.read_buffer = self.read_memory(addr - 0x1000, cart);
                    color
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.read_memory(addr, cart);
                    buffered
                };
                self.increment_data_address();
            }
            // Write-only registers read back whatever was last on the PPU bus
            _ => {}
        }
        self.io_latch
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8, cart: &mut dyn Cartridge, nmi: &mut NmiSignal) {
        self.io_latch = value;
        match addr & 0x0007 {
            0 => {
                let enabling_nmi = self.ctrl & CTRL_NMI == 0 && value & CTRL_NMI != 0;
                if enabling_nmi && self.status & STATUS_VBLANK != 0 {
                    log::debug!(
                        "NMI enabled during vblank at scanline {} dot {}",
                        self.scanline,
                        self.dot
                    );
                    nmi.raise();
                }
                self.ctrl = value;
                self.t.set_nametable(value & CTRL_NAMETABLE);
            }
            1 => self.mask = value,
            2 => {}
            3 => self.oam_addr = value,
            4 => {
                if self.rendering_active() {
                    self.oam_addr = self.oam_addr.wrapping_add(4);
                } else {
                    self.oam[self.oam_addr as usize] = value;
                    self.oam_addr = self.oam_addr.wrapping_add(1);
                }
            }
            5 => {
                if !self.write_toggle {
                    self.fine_x = value & 0x07;
                    self.t.set_coarse_x(value >> 3);
                } else {
                    self.t.set_fine_y(value & 0x07);
                    self.t.set_coarse_y(value >> 3);
                }
                self.write_toggle = !self.write_toggle;
            }
            6 => {
                if !self.write_toggle {
                    self.t.set_high_byte(value);
                } else {
                    self.t.set_low_byte(value);
                    self.v = self.t;
                }
                self.write_toggle = !self.write_toggle;
            }
            _ => {
                self.write_memory(self.v.raw(), value, cart);
                self.increment_data_address();
            }
        }
    }

    pub fn read_memory(&mut self, addr: u16, cart: &mut dyn Cartridge) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_read(addr),
            0x2000..=0x3EFF => self.vram[cart.mirroring().vram_index(addr)],
            _ => self.palette[palette_index(addr)],
        }
    }

    pub fn write_memory(&mut self, addr: u16, value: u8, cart: &mut dyn Cartridge) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_write(addr, value),
            0x2000..=0x3EFF => self.vram[cart.mirroring().vram_index(addr)] = value,
            _ => self.palette[palette_index(addr)] = value,
        }
    }

    /// Same mapping as [`Ppu::read_memory`] without touching mapper state.
    pub fn peek_memory(&self, addr: u16, cart: &dyn Cartridge) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => cart.ppu_peek(addr),
            0x2000..=0x3EFF => self.vram[cart.mirroring().vram_index(addr)],
            _ => self.palette[palette_index(addr)],
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::{Mirroring, NromCartridge};

    fn setup() -> (Ppu, NromCartridge, NmiSignal) {
        let cart = NromCartridge::new(vec![0; 0x8000], vec![], Mirroring::Vertical).unwrap();
        (Ppu::new(), cart, NmiSignal::new())
    }

    fn tick_until(ppu: &mut Ppu, cart: &mut NromCartridge, nmi: &mut NmiSignal, frame: u64, scanline: u16, dot: u16) -> u64 {
        let mut ticks = 0;
        while (ppu.frame(), ppu.scanline(), ppu.dot()) != (frame, scanline, dot) {
            ppu.tick(cart, nmi);
            ticks += 1;
        }
        ticks
    }

    fn set_address(ppu: &mut Ppu, cart: &mut NromCartridge, nmi: &mut NmiSignal, addr: u16) {
        ppu.cpu_write(0x2006, (addr >> 8) as u8, cart, nmi);
        ppu.cpu_write(0x2006, addr as u8, cart, nmi);
    }

    #[test]
    fn palette_backdrop_mirrors() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.write_memory(0x3F10, 0x2C, &mut cart);
        assert_eq!(ppu.read_memory(0x3F00, &mut cart), 0x2C);
        assert_eq!(ppu.read_memory(0x3F10, &mut cart), 0x2C);

        ppu.write_memory(0x3F05, 0x11, &mut cart);
        assert_eq!(ppu.read_memory(0x3F00, &mut cart), 0x2C);
        assert_eq!(ppu.read_memory(0x3F15, &mut cart), 0x00);

        ppu.write_memory(0x3F1C, 0x07, &mut cart);
        assert_eq!(ppu.read_memory(0x3F0C, &mut cart), 0x07);
        // $3F20-$3FFF repeat the 32 entries
        assert_eq!(ppu.read_memory(0x3FE5, &mut cart), 0x11);

        set_address(&mut ppu, &mut cart, &mut nmi, 0x3F10);
        assert_eq!(ppu.cpu_read(0x2007, &mut cart) & 0x3F, 0x2C);
    }

    #[test]
    fn palette_index_mapping() {
        assert_eq!(palette_index(0x3F00), 0x00);
        assert_eq!(palette_index(0x3F10), 0x00);
        assert_eq!(palette_index(0x3F14), 0x04);
        assert_eq!(palette_index(0x3F11), 0x11);
        assert_eq!(palette_index(0x3F04), 0x04);
        assert_eq!(palette_index(0x3F3F), 0x1F);
    }

    #[test]
    fn status_read_clears_vblank_and_toggle() {
        let (mut ppu, mut cart, mut nmi) = setup();
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, VBLANK_START_SCANLINE, 2);
        assert_ne!(ppu.status & STATUS_VBLANK, 0);

        ppu.cpu_write(0x2005, 0x1F, &mut cart, &mut nmi);
        assert!(ppu.write_toggle);

        let first = ppu.cpu_read(0x2002, &mut cart);
        assert_eq!(first & 0x80, 0x80);
        // Low five bits come from the last value written (0x1F)
        assert_eq!(first & 0x1F, 0x1F);
        assert!(!ppu.write_toggle);

        let second = ppu.cpu_read(0x2002, &mut cart);
        assert_eq!(second & 0x80, 0);
    }

    #[test]
    fn status_read_just_before_vblank_suppresses_it() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.ctrl = CTRL_NMI;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, VBLANK_START_SCANLINE, 0);
        ppu.cpu_read(0x2002, &mut cart);
        ppu.tick(&mut cart, &mut nmi);
        assert_eq!(ppu.status & STATUS_VBLANK, 0);
        assert!(!nmi.is_raised());
    }

    #[test]
    fn vblank_raises_nmi_when_enabled() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.cpu_write(0x2000, CTRL_NMI, &mut cart, &mut nmi);
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, VBLANK_START_SCANLINE, 0);
        assert!(!nmi.is_raised());
        ppu.tick(&mut cart, &mut nmi);
        assert!(nmi.take());

        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 1);
        assert_eq!(ppu.status & STATUS_VBLANK, 0);
        assert!(!nmi.is_raised());
    }

    #[test]
    fn enabling_nmi_inside_vblank_fires_immediately() {
        let (mut ppu, mut cart, mut nmi) = setup();
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 245, 0);
        assert!(!nmi.is_raised());

        ppu.cpu_write(0x2000, CTRL_NMI, &mut cart, &mut nmi);
        assert!(nmi.take());

        // Already enabled: no second edge
        ppu.cpu_write(0x2000, CTRL_NMI | 0x04, &mut cart, &mut nmi);
        assert!(!nmi.is_raised());

        // Once the flag has been read back, re-enabling does nothing
        ppu.cpu_write(0x2000, 0, &mut cart, &mut nmi);
        ppu.cpu_read(0x2002, &mut cart);
        ppu.cpu_write(0x2000, CTRL_NMI, &mut cart, &mut nmi);
        assert!(!nmi.is_raised());
    }

    #[test]
    fn data_port_reads_are_buffered_below_palette() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.write_memory(0x2000, 0xAA, &mut cart);
        ppu.write_memory(0x2001, 0xBB, &mut cart);
        ppu.write_memory(0x3F01, 0x21, &mut cart);

        set_address(&mut ppu, &mut cart, &mut nmi, 0x2000);
        let stale = ppu.cpu_read(0x2007, &mut cart);
        assert_eq!(stale, 0x00);
        assert_eq!(ppu.cpu_read(0x2007, &mut cart), 0xAA);
        assert_eq!(ppu.cpu_read(0x2007, &mut cart), 0xBB);

        set_address(&mut ppu, &mut cart, &mut nmi, 0x3F01);
        assert_eq!(ppu.cpu_read(0x2007, &mut cart) & 0x3F, 0x21);
    }

    #[test]
    fn data_port_increment_follows_ctrl() {
        let (mut ppu, mut cart, mut nmi) = setup();
        set_address(&mut ppu, &mut cart, &mut nmi, 0x2000);
        ppu.cpu_write(0x2007, 1, &mut cart, &mut nmi);
        assert_eq!(ppu.v.raw(), 0x2001);

        ppu.cpu_write(0x2000, CTRL_INCREMENT_32, &mut cart, &mut nmi);
        ppu.cpu_write(0x2007, 2, &mut cart, &mut nmi);
        assert_eq!(ppu.v.raw(), 0x2021);
        ppu.cpu_read(0x2007, &mut cart);
        assert_eq!(ppu.v.raw(), 0x2041);

        assert_eq!(ppu.read_memory(0x2000, &mut cart), 1);
        assert_eq!(ppu.read_memory(0x2001, &mut cart), 2);
    }

    #[test]
    fn scroll_and_address_writes_fill_t() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.cpu_write(0x2000, 0x02, &mut cart, &mut nmi);
        ppu.cpu_write(0x2005, 0x7D, &mut cart, &mut nmi); // coarse X 15, fine X 5
        ppu.cpu_write(0x2005, 0x5E, &mut cart, &mut nmi); // coarse Y 11, fine Y 6
        assert_eq!(ppu.fine_x, 5);
        assert_eq!(ppu.t.coarse_x(), 15);
        assert_eq!(ppu.t.coarse_y(), 11);
        assert_eq!(ppu.t.fine_y(), 6);
        assert_eq!(ppu.t.nametable(), 2);

        ppu.cpu_write(0x2006, 0xFF, &mut cart, &mut nmi);
        assert_eq!(ppu.t.raw() >> 8, 0x3F);
        ppu.cpu_write(0x2006, 0x10, &mut cart, &mut nmi);
        assert_eq!(ppu.v.raw(), 0x3F10);
    }

    #[test]
    fn vram_address_increments() {
        let mut v = VramAddress::new(0);
        v.set_coarse_x(31);
        v.increment_coarse_x();
        assert_eq!((v.coarse_x(), v.nametable()), (0, 1));

        let mut v = VramAddress::new(0);
        v.set_fine_y(7);
        v.set_coarse_y(29);
        v.increment_y();
        assert_eq!((v.fine_y(), v.coarse_y(), v.nametable()), (0, 0, 2));

        let mut v = VramAddress::new(0);
        v.set_fine_y(7);
        v.set_coarse_y(31);
        v.increment_y();
        assert_eq!((v.coarse_y(), v.nametable()), (0, 0));
    }

    #[test]
    fn frame_is_89342_dots_without_rendering() {
        let (mut ppu, mut cart, mut nmi) = setup();
        assert_eq!(tick_until(&mut ppu, &mut cart, &mut nmi, 1, 0, 0), 89_342);
        assert_eq!(tick_until(&mut ppu, &mut cart, &mut nmi, 2, 0, 0), 89_342);
    }

    #[test]
    fn odd_frames_skip_a_dot_while_rendering() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.mask = MASK_BACKGROUND;
        assert_eq!(tick_until(&mut ppu, &mut cart, &mut nmi, 1, 0, 0), 89_342);
        assert_eq!(tick_until(&mut ppu, &mut cart, &mut nmi, 2, 0, 0), 89_341);
        assert_eq!(tick_until(&mut ppu, &mut cart, &mut nmi, 3, 0, 0), 89_342);
    }

    #[test]
    fn rendering_disabled_outputs_backdrop() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.palette[0] = 0x21;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 1, 0);
        assert!(ppu.framebuffer[..NES_WIDTH].iter().all(|&c| c == 0x21));

        // v pointing into palette memory shows that entry instead
        ppu.palette[0x03] = 0x16;
        ppu.v = VramAddress::new(0x3F03);
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 2, 0);
        assert!(ppu.framebuffer[NES_WIDTH..2 * NES_WIDTH].iter().all(|&c| c == 0x16));
    }

    /// Tile 1 is solid color 1; it is placed at the top-left corner and at
    /// tile (2, 1).
    fn solid_tile_scene() -> (Ppu, NromCartridge, NmiSignal) {
        let (mut ppu, mut cart, _) = setup();
        for row in 0..8 {
            cart.ppu_write(0x0010 + row, 0xFF);
        }
        ppu.write_memory(0x2000, 0x01, &mut cart);
        ppu.write_memory(0x2022, 0x01, &mut cart);
        ppu.palette[0x00] = 0x0F;
        ppu.palette[0x01] = 0x16;
        ppu.palette[0x11] = 0x2A;
        (ppu, cart, NmiSignal::new())
    }

    #[test]
    fn renders_background_tiles() {
        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        ppu.mask = MASK_BACKGROUND | MASK_BACKGROUND_LEFT;
        tick_until(&mut ppu, &mut cart, &mut nmi, 2, 0, 0);

        let pixel = |x: usize, y: usize| ppu.framebuffer[y * NES_WIDTH + x];
        assert_eq!(pixel(0, 0), 0x16);
        assert_eq!(pixel(7, 7), 0x16);
        assert_eq!(pixel(8, 0), 0x0F);
        assert_eq!(pixel(0, 8), 0x0F);
        assert_eq!(pixel(16, 8), 0x16);
        assert_eq!(pixel(23, 15), 0x16);
        assert_eq!(pixel(24, 15), 0x0F);
    }

    #[test]
    fn left_column_clip_hides_background() {
        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        ppu.mask = MASK_BACKGROUND;
        tick_until(&mut ppu, &mut cart, &mut nmi, 2, 0, 0);
        assert_eq!(ppu.framebuffer[0], 0x0F);
    }

    #[test]
    fn renders_sprites_and_detects_sprite_zero_hit() {
        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        // Sprite 0 at x=16 with OAM y=9: drawn on lines 10-17
        ppu.oam[0..4].copy_from_slice(&[9, 0x01, 0x00, 16]);
        for sprite in 1..64 {
            ppu.oam[sprite * 4] = 0xFF;
        }
        ppu.mask = MASK_BACKGROUND | MASK_SPRITES | MASK_BACKGROUND_LEFT | MASK_SPRITES_LEFT;

        tick_until(&mut ppu, &mut cart, &mut nmi, 1, 20, 0);
        assert_ne!(ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
        assert_eq!(ppu.status & STATUS_SPRITE_OVERFLOW, 0);

        let pixel = |x: usize, y: usize| ppu.framebuffer[y * NES_WIDTH + x];
        assert_eq!(pixel(16, 10), 0x2A);
        assert_eq!(pixel(23, 17), 0x2A);
        assert_eq!(pixel(16, 9), 0x16);
        assert_eq!(pixel(24, 10), 0x0F);

        tick_until(&mut ppu, &mut cart, &mut nmi, 1, PRE_RENDER_SCANLINE, 2);
        assert_eq!(ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
    }

    #[test]
    fn more_than_eight_sprites_sets_overflow() {
        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        for sprite in 0..64 {
            let y = if sprite < 9 { 30 } else { 0xFF };
            ppu.oam[sprite * 4..sprite * 4 + 4].copy_from_slice(&[y, 0x01, 0x00, (sprite * 8) as u8]);
        }
        ppu.mask = MASK_SPRITES | MASK_SPRITES_LEFT;
        tick_until(&mut ppu, &mut cart, &mut nmi, 1, 40, 0);
        assert_ne!(ppu.status & STATUS_SPRITE_OVERFLOW, 0);
        // Only the first eight are drawn
        assert_eq!(ppu.framebuffer[31 * NES_WIDTH + 7 * 8], 0x2A);
        assert_eq!(ppu.framebuffer[31 * NES_WIDTH + 8 * 8], 0x0F);
    }

    #[test]
    fn oam_data_port() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.cpu_write(0x2003, 0x02, &mut cart, &mut nmi);
        ppu.cpu_write(0x2004, 0xFF, &mut cart, &mut nmi);
        assert_eq!(ppu.oam_addr, 0x03);
        ppu.cpu_write(0x2003, 0x02, &mut cart, &mut nmi);
        assert_eq!(ppu.cpu_read(0x2004, &mut cart), 0xE3);
    }

    /// Sprite-only scene with all 64 sprites parked off screen.
    fn sprite_scene() -> (Ppu, NromCartridge, NmiSignal) {
        let (mut ppu, cart, nmi) = setup();
        for sprite in 0..64 {
            ppu.oam[sprite * 4] = 0xFF;
        }
        ppu.palette[0x00] = 0x0F;
        ppu.palette[0x11] = 0x2A;
        ppu.mask = MASK_SPRITES | MASK_SPRITES_LEFT;
        (ppu, cart, nmi)
    }

    fn pixel(ppu: &Ppu, x: usize, y: usize) -> u8 {
        ppu.framebuffer[y * NES_WIDTH + x]
    }

    #[test]
    fn sprite_flips() {
        let (mut ppu, mut cart, mut nmi) = sprite_scene();
        // Tile 2: a single pixel in its top-left corner
        cart.ppu_write(0x0020, 0x80);
        for (slot, attr) in [0x00u8, 0x40, 0x80, 0xC0].into_iter().enumerate() {
            let x = 40 + slot as u8 * 24;
            ppu.oam[slot * 4..slot * 4 + 4].copy_from_slice(&[19, 0x02, attr, x]);
        }
        tick_until(&mut ppu, &mut cart, &mut nmi, 1, 30, 0);

        // No flip: top left of lines 20-27
        assert_eq!(pixel(&ppu, 40, 20), 0x2A);
        assert_eq!(pixel(&ppu, 47, 20), 0x0F);
        // Horizontal: top right
        assert_eq!(pixel(&ppu, 64, 20), 0x0F);
        assert_eq!(pixel(&ppu, 71, 20), 0x2A);
        // Vertical: bottom left
        assert_eq!(pixel(&ppu, 88, 20), 0x0F);
        assert_eq!(pixel(&ppu, 88, 27), 0x2A);
        // Both: bottom right
        assert_eq!(pixel(&ppu, 112, 20), 0x0F);
        assert_eq!(pixel(&ppu, 119, 27), 0x2A);
    }

    #[test]
    fn tall_sprites_use_tile_pairs() {
        let (mut ppu, mut cart, mut nmi) = sprite_scene();
        ppu.ctrl = CTRL_SPRITE_8X16;
        // Tile $02 is the top half, $03 the bottom half
        cart.ppu_write(0x0020, 0x80);
        cart.ppu_write(0x0037, 0x01);
        // Odd tile numbers select the $1000 table
        cart.ppu_write(0x1000, 0x80);
        ppu.oam[0..4].copy_from_slice(&[19, 0x02, 0x00, 40]);
        ppu.oam[4..8].copy_from_slice(&[19, 0x02, 0xC0, 80]);
        ppu.oam[8..12].copy_from_slice(&[19, 0x01, 0x00, 120]);
        tick_until(&mut ppu, &mut cart, &mut nmi, 1, 40, 0);

        // Sixteen lines tall: 20-35
        assert_eq!(pixel(&ppu, 40, 20), 0x2A);
        assert_eq!(pixel(&ppu, 47, 35), 0x2A);
        assert_eq!(pixel(&ppu, 47, 20), 0x0F);
        assert_eq!(pixel(&ppu, 40, 35), 0x0F);

        // Flipping both ways swaps the halves too
        assert_eq!(pixel(&ppu, 80, 20), 0x2A);
        assert_eq!(pixel(&ppu, 87, 20), 0x0F);
        assert_eq!(pixel(&ppu, 80, 35), 0x0F);
        assert_eq!(pixel(&ppu, 87, 35), 0x2A);

        assert_eq!(pixel(&ppu, 120, 20), 0x2A);
    }

    #[test]
    fn sprites_behind_background_show_only_through_transparent_pixels() {
        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        for sprite in 0..64 {
            ppu.oam[sprite * 4] = 0xFF;
        }
        // Behind the solid tile at (16, 8)-(23, 15), lines 10-17
        ppu.oam[0..4].copy_from_slice(&[9, 0x01, 0x20, 16]);
        // A front sprite under a behind sprite still loses to the background
        ppu.oam[4..8].copy_from_slice(&[9, 0x01, 0x00, 16]);
        ppu.mask = MASK_BACKGROUND | MASK_SPRITES | MASK_BACKGROUND_LEFT | MASK_SPRITES_LEFT;
        tick_until(&mut ppu, &mut cart, &mut nmi, 1, 20, 0);

        assert_eq!(pixel(&ppu, 16, 10), 0x16);
        assert_eq!(pixel(&ppu, 23, 15), 0x16);
        assert_eq!(pixel(&ppu, 16, 16), 0x2A);
        assert_eq!(pixel(&ppu, 23, 17), 0x2A);
        // Priority does not stop sprite 0 hits
        assert_ne!(ppu.status & STATUS_SPRITE_ZERO_HIT, 0);
    }

    #[test]
    fn greyscale_keeps_only_the_luma_bits() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.palette[0] = 0x21;
        ppu.mask = MASK_GREYSCALE;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 1, 0);
        assert!(ppu.framebuffer[..NES_WIDTH].iter().all(|&c| c == 0x20));

        let (mut ppu, mut cart, mut nmi) = solid_tile_scene();
        ppu.mask = MASK_BACKGROUND | MASK_BACKGROUND_LEFT | MASK_GREYSCALE;
        tick_until(&mut ppu, &mut cart, &mut nmi, 2, 0, 0);
        assert_eq!(pixel(&ppu, 0, 0), 0x10);
        assert_eq!(pixel(&ppu, 8, 0), 0x00);
    }

    #[test]
    fn oam_data_writes_while_rendering_only_bump_the_address() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.mask = MASK_BACKGROUND;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 10, 100);
        ppu.oam_addr = 0x10;
        ppu.cpu_write(0x2004, 0x55, &mut cart, &mut nmi);
        assert_eq!(ppu.oam[0x10], 0x00);
        assert_eq!(ppu.oam_addr, 0x14);

        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 245, 0);
        ppu.oam_addr = 0x14;
        ppu.cpu_write(0x2004, 0x55, &mut cart, &mut nmi);
        assert_eq!(ppu.oam[0x14], 0x55);
        assert_eq!(ppu.oam_addr, 0x15);
    }

    #[test]
    fn data_port_access_while_rendering_clocks_scroll_counters() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.mask = MASK_BACKGROUND;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 10, 100);

        let mut v = VramAddress::new(0);
        v.set_coarse_x(5);
        v.set_coarse_y(3);
        v.set_fine_y(2);
        ppu.v = v;
        ppu.cpu_read(0x2007, &mut cart);
        assert_eq!((ppu.v.coarse_x(), ppu.v.coarse_y(), ppu.v.fine_y()), (6, 3, 3));

        ppu.cpu_write(0x2007, 0x00, &mut cart, &mut nmi);
        assert_eq!((ppu.v.coarse_x(), ppu.v.coarse_y(), ppu.v.fine_y()), (7, 3, 4));

        // Outside rendering the normal increment applies
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 245, 0);
        ppu.v = v;
        ppu.cpu_read(0x2007, &mut cart);
        assert_eq!(ppu.v.raw(), v.raw() + 1);
    }

    #[test]
    fn pre_render_line_copies_vertical_scroll() {
        let mut t = VramAddress::new(0);
        t.set_coarse_x(9);
        t.set_coarse_y(7);
        t.set_fine_y(5);
        t.set_nametable(2);

        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.mask = MASK_BACKGROUND;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 279);
        ppu.t = t;
        ppu.v = VramAddress::new(0);
        ppu.tick(&mut cart, &mut nmi);
        assert_eq!(ppu.v.coarse_y(), 7);

        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 304);
        assert_eq!(ppu.v.fine_y(), 5);
        assert_eq!(ppu.v.nametable(), 2);
        // Horizontal bits wait for dot 257
        assert_eq!(ppu.v.coarse_x(), 0);

        // No copy with rendering disabled
        let (mut ppu, mut cart, mut nmi) = setup();
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 279);
        ppu.t = t;
        ppu.v = VramAddress::new(0);
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 304);
        assert_eq!(ppu.v.raw(), 0);
    }

    #[test]
    fn sprite_fetches_hold_oam_address_at_zero() {
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.mask = MASK_SPRITES;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 10, 256);
        ppu.oam_addr = 0x40;
        ppu.tick(&mut cart, &mut nmi);
        assert_eq!(ppu.oam_addr, 0);

        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 10, 300);
        ppu.oam_addr = 0x40;
        ppu.tick(&mut cart, &mut nmi);
        assert_eq!(ppu.oam_addr, 0);

        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 10, 320);
        ppu.oam_addr = 0x40;
        ppu.tick(&mut cart, &mut nmi);
        assert_eq!(ppu.oam_addr, 0x40);

        // Untouched while rendering is off
        let (mut ppu, mut cart, mut nmi) = setup();
        ppu.oam_addr = 0x40;
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, 11, 0);
        assert_eq!(ppu.oam_addr, 0x40);
    }

    #[test]
    fn enabling_nmi_on_pre_render_dot_zero_fires() {
        let (mut ppu, mut cart, mut nmi) = setup();
        tick_until(&mut ppu, &mut cart, &mut nmi, 0, PRE_RENDER_SCANLINE, 0);
        assert!(!ppu.in_vblank());
        assert_ne!(ppu.status & STATUS_VBLANK, 0);
        ppu.cpu_write(0x2000, CTRL_NMI, &mut cart, &mut nmi);
        assert!(nmi.take());

        // One dot later the flag is gone
        ppu.cpu_write(0x2000, 0, &mut cart, &mut nmi);
        ppu.tick(&mut cart, &mut nmi);
        ppu.cpu_write(0x2000, CTRL_NMI, &mut cart, &mut nmi);
        assert!(!nmi.is_raised());
    }
}

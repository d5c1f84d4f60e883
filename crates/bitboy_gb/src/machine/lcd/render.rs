use bitboy_common::{bits, BitVector};

use super::{Lcdc, LcdController, LcdImageLine, LcdImageLineBuilder, LcdReg};
use crate::SCREEN_WIDTH;

/// Side of the background and window planes, in pixels.
const PLANE_SIZE: usize = 256;
const TILES_PER_ROW: usize = 32;
const TILE_BYTES: usize = 16;

/// VRAM offsets of the two tile maps.
const TILE_MAP_LOW: usize = 0x1800;
const TILE_MAP_HIGH: usize = 0x1C00;
/// Base of the signed tile data area (tile 0 lives at 0x9000).
const SIGNED_TILE_BASE: i32 = 0x1000;

/// Window position register offset: WX = 7 puts the window on column 0.
const WX_OFFSET: i64 = 7;
const WX_MAX: u8 = 166;

const OAM_ENTRIES: usize = 40;
const MAX_SPRITES_PER_LINE: usize = 10;
const SPRITE_Y_OFFSET: i32 = 16;
const SPRITE_X_OFFSET: i64 = 8;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct SpriteAttr: u8 {
        const PALETTE = 1 << 4;
        const FLIP_H = 1 << 5;
        const FLIP_V = 1 << 6;
        const BEHIND_BG = 1 << 7;
    }
}

#[derive(Clone, Copy, Debug)]
struct Sprite {
    y: i32,
    x: i64,
    tile: u8,
    attr: SpriteAttr,
}

impl LcdController {
    /// Draws line `ly` of the frame: background, window, then sprites.
    pub(super) fn render_line(&mut self, ly: u8) -> LcdImageLine {
        let lcdc = self.lcdc();
        let mut line = LcdImageLine::blank(SCREEN_WIDTH);

        if lcdc.contains(Lcdc::BG) {
            let bg_y = ly.wrapping_add(self.reg(LcdReg::Scy));
            line = self
                .plane_line(lcdc.contains(Lcdc::BG_AREA), bg_y)
                .extract_wrapped(self.reg(LcdReg::Scx) as i64, SCREEN_WIDTH)
                .map_colors(self.reg(LcdReg::Bgp));

            let wx = self.reg(LcdReg::Wx);
            if lcdc.contains(Lcdc::WIN) && wx <= WX_MAX && ly >= self.reg(LcdReg::Wy) {
                let x = wx as i64 - WX_OFFSET;
                let window = self
                    .plane_line(lcdc.contains(Lcdc::WIN_AREA), self.win_y)
                    .extract_zero_extended(0, SCREEN_WIDTH)
                    .shift(x)
                    .map_colors(self.reg(LcdReg::Bgp));
                line = line.join(&window, x.max(0) as usize);
                self.win_y = self.win_y.wrapping_add(1);
            }
        }

        if lcdc.contains(Lcdc::OBJ) {
            let (sprites, behind) = self.sprite_line_with_priority(ly);
            let hidden = behind.and(line.opacity());
            let mask = sprites.opacity().and(&hidden.not());
            line = line.below_with_mask(&sprites, &mask);
        }
        line
    }

    /// Row `y` of the 256x256 background or window plane.
    fn plane_line(&self, high_map: bool, y: u8) -> LcdImageLine {
        let map = if high_map { TILE_MAP_HIGH } else { TILE_MAP_LOW };
        let row_start = map + (y as usize / 8) * TILES_PER_ROW;
        let row_in_tile = (y % 8) as usize;
        let unsigned_tiles = self.lcdc().contains(Lcdc::TILE_SOURCE);

        let mut builder = LcdImageLineBuilder::new(PLANE_SIZE);
        for column in 0..TILES_PER_ROW {
            let tile = self.vram.read(row_start + column);
            let tile_start = if unsigned_tiles {
                tile as usize * TILE_BYTES
            } else {
                (SIGNED_TILE_BASE + bits::sign_extend8(tile) * TILE_BYTES as i32) as usize
            };
            let (msb, lsb) = self.tile_row(tile_start + 2 * row_in_tile);
            builder.set_bytes(column, bits::reverse8(msb), bits::reverse8(lsb));
        }
        builder.build()
    }

    /// Plane bytes (msb, lsb) of a tile row; bit 7 is the leftmost pixel.
    fn tile_row(&self, offset: usize) -> (u8, u8) {
        (self.vram.read(offset + 1), self.vram.read(offset))
    }

    /// Up to ten sprites crossing line `ly`, in OAM order.
    fn sprites_on_line(&self, ly: u8) -> Vec<Sprite> {
        let height = self.sprite_height();
        (0..OAM_ENTRIES)
            .map(|i| {
                let entry = |k| self.oam.read(4 * i + k);
                Sprite {
                    y: entry(0) as i32 - SPRITE_Y_OFFSET,
                    x: entry(1) as i64 - SPRITE_X_OFFSET,
                    tile: entry(2),
                    attr: SpriteAttr::from_bits_truncate(entry(3)),
                }
            })
            .filter(|s| (s.y..s.y + height).contains(&(ly as i32)))
            .take(MAX_SPRITES_PER_LINE)
            .collect()
    }

    fn sprite_height(&self) -> i32 {
        if self.lcdc().contains(Lcdc::OBJ_SIZE) {
            16
        } else {
            8
        }
    }

    /// All sprites of line `ly` merged into one line, plus the pixels whose
    /// winning sprite sits behind the background. Sprites with a smaller X
    /// cover the others; ties go to the earlier OAM entry.
    fn sprite_line_with_priority(&self, ly: u8) -> (LcdImageLine, BitVector) {
        let mut sprites = self.sprites_on_line(ly);
        sprites.sort_by_key(|s| s.x);

        let mut merged = LcdImageLine::blank(SCREEN_WIDTH);
        let mut behind = BitVector::new(SCREEN_WIDTH);
        for sprite in &sprites {
            let line = self.sprite_line(sprite, ly);
            if sprite.attr.contains(SpriteAttr::BEHIND_BG) {
                let won = line.opacity().and(&merged.opacity().not());
                behind = behind.or(&won);
            }
            merged = line.below(&merged);
        }
        (merged, behind)
    }

    fn sprite_line(&self, sprite: &Sprite, ly: u8) -> LcdImageLine {
        let height = self.sprite_height();
        let mut row = ly as i32 - sprite.y;
        if sprite.attr.contains(SpriteAttr::FLIP_V) {
            row = height - 1 - row;
        }
        let tile = if height == 16 { sprite.tile & 0xFE } else { sprite.tile };
        let (mut msb, mut lsb) = self.tile_row(tile as usize * TILE_BYTES + 2 * row as usize);
        if !sprite.attr.contains(SpriteAttr::FLIP_H) {
            msb = bits::reverse8(msb);
            lsb = bits::reverse8(lsb);
        }
        let palette = if sprite.attr.contains(SpriteAttr::PALETTE) {
            self.reg(LcdReg::Obp1)
        } else {
            self.reg(LcdReg::Obp0)
        };

        let mut builder = LcdImageLineBuilder::new(SCREEN_WIDTH);
        builder.set_bytes(0, msb, lsb);
        builder.build().shift(sprite.x).map_colors(palette)
    }
}

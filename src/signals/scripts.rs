//! Browser-side probe scripts. Each evaluates to a JSON value (awaiting a
//! promise where needed) and reports failures as data instead of throwing.

use crate::runtime::Probe;

pub const WEBGPU: Probe = Probe {
    name: "webgpu",
    script: r#"(async () => {
        const gpu = navigator.gpu;
        if (!gpu) return { supported: false, error: 'API_NOT_SUPPORTED' };
        try {
            const adapter = await gpu.requestAdapter();
            if (!adapter) return { supported: true, status: 'NoAdapter' };

            let info;
            if (adapter.info) {
                info = adapter.info;
            } else if (typeof adapter.requestAdapterInfo === 'function') {
                try {
                    info = await adapter.requestAdapterInfo();
                } catch (err) {
                    info = { error: 'ADAPTER_INFO_BLOCKED' };
                }
            } else {
                info = { error: 'ADAPTER_INFO_NOT_AVAILABLE' };
            }

            const limits = adapter.limits || {};
            return {
                supported: true,
                vendor: info.vendor || null,
                architecture: info.architecture || null,
                driverVersion: info.driverVersion || null,
                error: info.error || null,
                maxTextureDimension: limits.maxTextureDimension2D || 0,
                maxBufferSize: limits.maxBufferSize || 0,
            };
        } catch (error) {
            return { supported: false, error: String(error && error.message || error) };
        }
    })()"#,
};

pub const SENSORS: Probe = Probe {
    name: "sensors",
    script: r#"(async () => {
        let state = 'unknown';
        if (navigator.permissions) {
            try {
                state = (await navigator.permissions.query({ name: 'accelerometer' })).state;
            } catch (e) {
                state = 'not_supported';
            }
        }
        return {
            gyroscope_supported: 'Gyroscope' in self,
            accel_permission_state: state,
        };
    })()"#,
};

pub const CANVAS_HASH: Probe = Probe {
    name: "canvas_hash",
    script: r#"(() => {
        const fnv1a = (s) => {
            let h = 0x811c9dc5;
            for (let i = 0; i < s.length; i++) {
                h ^= s.charCodeAt(i);
                h = Math.imul(h, 0x01000193) >>> 0;
            }
            return h.toString(16).padStart(8, '0');
        };
        const canvas = document.createElement('canvas');
        canvas.width = 240;
        canvas.height = 60;
        const ctx = canvas.getContext('2d');
        if (!ctx) return null;
        ctx.textBaseline = 'top';
        ctx.font = "16px 'Arial'";
        ctx.fillStyle = '#f60';
        ctx.fillRect(100, 1, 62, 20);
        ctx.fillStyle = '#069';
        ctx.fillText('fp-sampler ☃', 2, 15);
        return fnv1a(canvas.toDataURL());
    })()"#,
};

pub const WEBGL_RENDERER: Probe = Probe {
    name: "webgl_renderer",
    script: r#"(() => {
        const gl = document.createElement('canvas').getContext('webgl');
        if (!gl) return null;
        const ext = gl.getExtension('WEBGL_debug_renderer_info');
        return ext ? gl.getParameter(ext.UNMASKED_RENDERER_WEBGL) : gl.getParameter(gl.RENDERER);
    })()"#,
};

pub const AUDIO_VALUE: Probe = Probe {
    name: "audio_value",
    script: r#"(async () => {
        const Ctx = self.OfflineAudioContext || self.webkitOfflineAudioContext;
        if (!Ctx) return null;
        const ctx = new Ctx(1, 5000, 44100);
        const osc = ctx.createOscillator();
        osc.type = 'triangle';
        osc.frequency.value = 10000;
        const comp = ctx.createDynamicsCompressor();
        osc.connect(comp);
        comp.connect(ctx.destination);
        osc.start(0);
        const buffer = await ctx.startRendering();
        const data = buffer.getChannelData(0);
        let sum = 0;
        for (let i = 4500; i < 5000; i++) sum += Math.abs(data[i]);
        return sum;
    })()"#,
};

pub const MATH_JITTER: Probe = Probe {
    name: "math_jitter_hash",
    script: r#"(() => {
        const fnv1a = (s) => {
            let h = 0x811c9dc5;
            for (let i = 0; i < s.length; i++) {
                h ^= s.charCodeAt(i);
                h = Math.imul(h, 0x01000193) >>> 0;
            }
            return h.toString(16).padStart(8, '0');
        };
        const values = [
            Math.tan(-1e300), Math.sinh(1), Math.cosh(10), Math.expm1(1),
            Math.atanh(0.5), Math.cbrt(Math.PI), Math.log1p(10), Math.pow(Math.PI, -100),
        ];
        return fnv1a(values.join(','));
    })()"#,
};
